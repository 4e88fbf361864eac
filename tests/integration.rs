use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use csftp_server::{Server, ServerConfig};

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    // Helper to connect to the server and consume the greeting
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(read_half),
            writer,
        };
        assert_eq!(client.read_reply().await, "220 connected.");
        client
    }

    async fn read_reply(&mut self) -> String {
        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(10), self.reader.read_line(&mut line))
            .await
            .expect("reply timed out")
            .unwrap();
        line.trim_end().to_string()
    }

    // Helper to send command and read response
    async fn send_command(&mut self, command: &str) -> String {
        self.writer
            .write_all(format!("{}\r\n", command).as_bytes())
            .await
            .unwrap();
        self.read_reply().await
    }
}

async fn start_test_server(timeout_secs: u64) -> (tempfile::TempDir, PathBuf, SocketAddr) {
    start_server_with_limit(timeout_secs, ServerConfig::default().max_clients).await
}

// Helper to setup test environment and start the server
async fn start_server_with_limit(
    timeout_secs: u64,
    max_clients: usize,
) -> (tempfile::TempDir, PathBuf, SocketAddr) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("test.txt"), b"line one\nline two\n").unwrap();
    fs::write(root.join("binary.dat"), (0..=255u8).cycle().take(70_000).collect::<Vec<_>>())
        .unwrap();
    fs::create_dir(root.join("dir1")).unwrap();

    let config = ServerConfig {
        control_port: 0,
        server_root: root.to_string_lossy().into_owned(),
        data_connection_timeout_secs: timeout_secs,
        max_clients,
        ..ServerConfig::default()
    };

    let server = Server::new(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move { server.start().await });

    (dir, root, addr)
}

fn pasv_addr(reply: &str) -> SocketAddr {
    let start = reply.find('(').unwrap() + 1;
    let end = reply.find(')').unwrap();
    let nums: Vec<u16> = reply[start..end]
        .split(',')
        .map(|n| n.trim().parse().unwrap())
        .collect();
    assert_eq!(nums.len(), 6);
    let ip = Ipv4Addr::new(nums[0] as u8, nums[1] as u8, nums[2] as u8, nums[3] as u8);
    SocketAddr::from((ip, nums[4] * 256 + nums[5]))
}

#[tokio::test]
async fn test_login_gate() {
    let (_dir, _root, addr) = start_test_server(1).await;
    let mut client = Client::connect(addr).await;

    assert_eq!(client.send_command("PWD").await, "530 Please login with USER.");
    assert_eq!(client.send_command("USER wrong").await, "331 Wrong username.");
    assert_eq!(client.send_command("PASV").await, "530 Please login with USER.");
    assert_eq!(client.send_command("user cs317").await, "230 login successful.");
    assert_eq!(client.send_command("USER wrong").await, "331 cannot change from guest user.");
}

#[tokio::test]
async fn test_end_to_end_retrieval() {
    let (_dir, root, addr) = start_test_server(5).await;
    let mut client = Client::connect(addr).await;

    assert_eq!(client.send_command("USER cs317").await, "230 login successful.");
    assert_eq!(
        client.send_command("PWD").await,
        format!("257 \"{}\"", root.display())
    );
    assert_eq!(client.send_command("TYPE I").await, "200 Switching to Binary mode.");
    assert_eq!(client.send_command("RETR binary.dat").await, "425 Use PASV first.");

    let reply = client.send_command("PASV").await;
    assert!(reply.starts_with("227 Entering Passive Mode ("), "{}", reply);
    assert!(reply.ends_with(")."), "{}", reply);

    let mut data = TcpStream::connect(pasv_addr(&reply)).await.unwrap();
    assert_eq!(
        client.send_command("RETR binary.dat").await,
        "150 Opening data connection for binary.dat (70000 bytes)."
    );
    let mut received = Vec::new();
    data.read_to_end(&mut received).await.unwrap();
    assert_eq!(client.read_reply().await, "226 File transfer success.");
    assert_eq!(received, fs::read(root.join("binary.dat")).unwrap());

    // The channel was consumed by the transfer.
    assert_eq!(client.send_command("RETR test.txt").await, "425 Use PASV first.");

    assert_eq!(client.send_command("QUIT").await, "221 Goodbye.");
    let mut rest = String::new();
    let n = client.reader.read_line(&mut rest).await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_directory_listing_and_navigation() {
    let (_dir, root, addr) = start_test_server(5).await;
    let mut client = Client::connect(addr).await;
    client.send_command("USER cs317").await;

    assert_eq!(client.send_command("CDUP").await, "550 No access to directory.");
    assert_eq!(client.send_command("CWD ..").await, "550 No access to directory.");

    let reply = client.send_command("PASV").await;
    let mut data = TcpStream::connect(pasv_addr(&reply)).await.unwrap();
    assert_eq!(
        client.send_command("NLST").await,
        "150 Here comes the directory listing."
    );
    let mut listing = String::new();
    data.read_to_string(&mut listing).await.unwrap();
    assert_eq!(client.read_reply().await, "226 Directory send OK.");
    assert_eq!(listing, "binary.dat\r\ndir1\r\ntest.txt\r\n");

    assert_eq!(client.send_command("CWD dir1").await, "250 Directory successfully changed.");
    assert_eq!(
        client.send_command("PWD").await,
        format!("257 \"{}\"", root.join("dir1").display())
    );
    assert_eq!(client.send_command("CDUP").await, "250 Directory successfully changed.");
}

#[tokio::test]
async fn test_second_pasv_closes_first_listener() {
    let (_dir, _root, addr) = start_test_server(5).await;
    let mut client = Client::connect(addr).await;
    client.send_command("USER cs317").await;

    let first = pasv_addr(&client.send_command("PASV").await);
    let mut second = pasv_addr(&client.send_command("PASV").await);
    // A repeated random port would reopen the first address.
    while second == first {
        second = pasv_addr(&client.send_command("PASV").await);
    }

    assert!(TcpStream::connect(first).await.is_err());

    let mut data = TcpStream::connect(second).await.unwrap();
    assert_eq!(
        client.send_command("RETR test.txt").await,
        "150 Opening data connection for test.txt (18 bytes)."
    );
    let mut received = Vec::new();
    data.read_to_end(&mut received).await.unwrap();
    assert_eq!(client.read_reply().await, "226 File transfer success.");
    assert_eq!(received, b"line one\nline two\n");
}

#[tokio::test]
async fn test_nlst_times_out_without_data_connection() {
    let (_dir, _root, addr) = start_test_server(1).await;
    let mut client = Client::connect(addr).await;
    client.send_command("USER cs317").await;

    client.send_command("PASV").await;
    assert_eq!(
        client.send_command("NLST").await,
        "425 Failed to establish connection."
    );
    // The session survives the timeout.
    assert_eq!(client.send_command("NLST").await, "425 Use PASV first.");
    assert_eq!(client.send_command("MODE S").await, "200 Mode set to S.");
}

#[tokio::test]
async fn test_unknown_and_malformed_commands() {
    let (_dir, _root, addr) = start_test_server(1).await;
    let mut client = Client::connect(addr).await;
    client.send_command("USER cs317").await;

    assert_eq!(client.send_command("BADCMD").await, "500 unknown command.");
    assert_eq!(client.send_command("CWD a b").await, "500 unknown command.");
    assert_eq!(client.send_command("STRU X").await, "504 Bad STRU command.");
    assert_eq!(client.send_command("RETR").await, "425 Use PASV first.");

    let long = format!("CWD {}", "x".repeat(600));
    assert_eq!(client.send_command(&long).await, "500 Command too long.");
}

#[tokio::test]
async fn test_quit_before_login() {
    let (_dir, _root, addr) = start_test_server(1).await;
    let mut client = Client::connect(addr).await;
    assert_eq!(client.send_command("QUIT").await, "221 Goodbye.");
}

#[tokio::test]
async fn test_unterminated_line_is_cut_off_at_limit() {
    let (_dir, _root, addr) = start_test_server(1).await;
    let mut client = Client::connect(addr).await;

    // No newline yet: the reply must come from the length limit alone.
    let flood = format!("CWD {}", "x".repeat(1 << 20));
    client.writer.write_all(flood.as_bytes()).await.unwrap();
    assert_eq!(client.read_reply().await, "500 Command too long.");

    // The rest of the oversized line is dropped, then commands resume.
    client.writer.write_all(b"xxxx\r\n").await.unwrap();
    assert_eq!(client.send_command("USER cs317").await, "230 login successful.");
    assert_eq!(client.send_command("MODE S").await, "200 Mode set to S.");
}

#[tokio::test]
async fn test_connections_over_limit_are_refused() {
    let (_dir, _root, addr) = start_server_with_limit(1, 1).await;
    let mut first = Client::connect(addr).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let mut second = BufReader::new(stream);
    let mut line = String::new();
    second.read_line(&mut line).await.unwrap();
    assert_eq!(line.trim_end(), "421 Too many connections. Try again later.");
    line.clear();
    assert_eq!(second.read_line(&mut line).await.unwrap(), 0);

    // The first session is unaffected; once it ends its slot frees up.
    assert_eq!(first.send_command("USER cs317").await, "230 login successful.");
    assert_eq!(first.send_command("QUIT").await, "221 Goodbye.");
    drop(first);

    let mut third = None;
    for _ in 0..50 {
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut reader = BufReader::new(stream);
        let mut greeting = String::new();
        reader.read_line(&mut greeting).await.unwrap();
        if greeting.trim_end() == "220 connected." {
            third = Some(reader);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(third.is_some());
}
