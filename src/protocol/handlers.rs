//! Command handlers module for the CSftp server.
//!
//! This module routes parsed commands to one handler per verb, enforcing the
//! login gate and the PASV-before-transfer rule. RETR and NLST write their
//! provisional `150` reply straight to the control connection; every other
//! reply travels back to the caller inside the [`CommandResult`].

use log::{error, info, warn};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::auth;
use crate::client::Session;
use crate::config::ServerConfig;
use crate::error::NavigateError;
use crate::navigate::{change_directory, parent_directory};
use crate::protocol::responses::*;
use crate::protocol::{Command, CommandResult, CommandStatus};
use crate::storage::{list_entries, prepare_file_retrieval};
use crate::transfer::{DataChannel, pasv_tuple, send_file};

/// Dispatches a received FTP command to its corresponding handler.
///
/// # Arguments
///
/// * `session` - State of the control connection sending the command.
/// * `channel` - The session's passive data channel.
/// * `command` - The parsed command.
/// * `control` - Control connection writer, used for provisional replies.
/// * `config` - Server configuration.
pub async fn handle_command<W>(
    session: &mut Session,
    channel: &DataChannel,
    command: &Command,
    control: &mut W,
    config: &ServerConfig,
) -> CommandResult
where
    W: AsyncWrite + Unpin,
{
    if !session.is_logged_in() {
        return handle_auth_command(session, command, config);
    }

    match command {
        Command::USER(Some(_)) => {
            CommandResult::failure("Already logged in", USER_REJECTED, MSG_GUEST_ONLY)
        }
        Command::USER(None) => handle_cmd_unknown(),
        Command::CWD(dir) => handle_cmd_cwd(session, dir.as_deref()),
        Command::CDUP => handle_cmd_cdup(session),
        Command::PWD => handle_cmd_pwd(session),
        Command::TYPE(arg) => handle_cmd_type(session, arg.as_deref()),
        Command::MODE(arg) => handle_cmd_mode(arg.as_deref()),
        Command::STRU(arg) => handle_cmd_stru(arg.as_deref()),
        Command::PASV => handle_cmd_pasv(session, channel, config).await,
        Command::RETR(filename) => {
            handle_cmd_retr(session, channel, filename.as_deref(), control, config).await
        }
        Command::NLST => handle_cmd_nlst(session, channel, control, config).await,
        Command::QUIT => handle_cmd_quit(),
        Command::UNKNOWN => handle_cmd_unknown(),
    }
}

/// Handles commands before login: only USER and QUIT are accepted.
pub fn handle_auth_command(
    session: &mut Session,
    command: &Command,
    config: &ServerConfig,
) -> CommandResult {
    match command {
        Command::USER(Some(username)) => handle_cmd_user(session, username, config),
        Command::QUIT => handle_cmd_quit(),
        _ => CommandResult::failure("Authentication required", NOT_LOGGED_IN, MSG_LOGIN_REQUIRED),
    }
}

/// Handles the QUIT command. The caller sends the reply after cleanup.
fn handle_cmd_quit() -> CommandResult {
    CommandResult {
        status: CommandStatus::CloseConnection,
        message: Some(format_response(GOODBYE, MSG_GOODBYE)),
    }
}

/// Handles the USER command while unauthenticated.
fn handle_cmd_user(session: &mut Session, username: &str, config: &ServerConfig) -> CommandResult {
    match auth::validate_user(username, config) {
        Ok(()) => {
            session.mark_logged_in();
            info!("Client {} logged in as {}", session.peer(), username);
            CommandResult::success(LOGIN_SUCCESS, MSG_LOGIN_OK)
        }
        Err(e) => {
            warn!("Client {} login rejected: {}", session.peer(), e);
            CommandResult::failure(e.to_string(), USER_REJECTED, MSG_WRONG_USER)
        }
    }
}

/// Handles the CWD command.
fn handle_cmd_cwd(session: &mut Session, dir: Option<&Path>) -> CommandResult {
    let Some(dir) = dir else {
        return handle_cmd_unknown();
    };

    match change_directory(session.root(), session.current_directory(), dir) {
        Ok(path) => {
            info!("Client {} changed directory to {}", session.peer(), path.display());
            session.set_current_directory(path);
            CommandResult::success(FILE_ACTION_OK, MSG_DIR_CHANGED)
        }
        Err(e) => navigate_failure(e),
    }
}

/// Handles the CDUP command.
fn handle_cmd_cdup(session: &mut Session) -> CommandResult {
    match parent_directory(session.root(), session.current_directory()) {
        Ok(path) => {
            info!("Client {} moved up to {}", session.peer(), path.display());
            session.set_current_directory(path);
            CommandResult::success(FILE_ACTION_OK, MSG_DIR_CHANGED)
        }
        Err(e) => navigate_failure(e),
    }
}

fn navigate_failure(e: NavigateError) -> CommandResult {
    let text = match e {
        NavigateError::NoAccess(_) => MSG_DIR_NO_ACCESS,
        _ => MSG_DIR_FAILED,
    };
    CommandResult::failure(e.to_string(), FILE_UNAVAILABLE, text)
}

/// Handles the PWD command: reports the absolute working directory.
fn handle_cmd_pwd(session: &Session) -> CommandResult {
    let text = format!("\"{}\"", session.current_directory().display());
    CommandResult::success(PATH_CREATED, &text)
}

/// Handles the TYPE command.
fn handle_cmd_type(session: &mut Session, arg: Option<&str>) -> CommandResult {
    match arg {
        Some("A") | Some("a") => {
            session.set_binary(false);
            CommandResult::success(OK, MSG_ASCII)
        }
        Some("I") | Some("i") => {
            session.set_binary(true);
            CommandResult::success(OK, MSG_BINARY)
        }
        _ => CommandResult::failure("Bad TYPE argument", SYNTAX_ERROR, MSG_BAD_TYPE),
    }
}

/// Handles the MODE command; only stream mode exists.
fn handle_cmd_mode(arg: Option<&str>) -> CommandResult {
    match arg {
        Some("S") | Some("s") => CommandResult::success(OK, MSG_MODE_S),
        _ => CommandResult::failure("Bad MODE argument", BAD_PARAMETER, MSG_BAD_MODE),
    }
}

/// Handles the STRU command; only file structure exists.
fn handle_cmd_stru(arg: Option<&str>) -> CommandResult {
    match arg {
        Some("F") | Some("f") => CommandResult::success(OK, MSG_STRU_F),
        _ => CommandResult::failure("Bad STRU argument", BAD_PARAMETER, MSG_BAD_STRU),
    }
}

/// Handles the PASV command: replaces any existing data channel with a new
/// listener and reports its address.
async fn handle_cmd_pasv(
    session: &mut Session,
    channel: &DataChannel,
    config: &ServerConfig,
) -> CommandResult {
    let bind_ip = config
        .bind_ip()
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    session.set_passive_mode(false);

    match channel
        .open_passive(bind_ip, config.data_port_range(), config.max_bind_attempts)
        .await
    {
        Ok(data_socket) => {
            session.set_passive_mode(true);

            let text = format!(
                "Entering Passive Mode {}.",
                pasv_tuple(session.advertised_ip(), data_socket.port())
            );
            info!(
                "Client {} bound to data socket {} in PASV mode",
                session.peer(),
                data_socket
            );
            CommandResult::success(ENTERING_PASSIVE, &text)
        }
        Err(e) => {
            error!("PASV failed for client {}: {}", session.peer(), e);
            CommandResult::failure(e.to_string(), CANT_OPEN_DATA, MSG_CANT_OPEN_DATA)
        }
    }
}

/// Handles the RETR command: sends one file over the data channel.
async fn handle_cmd_retr<W>(
    session: &mut Session,
    channel: &DataChannel,
    filename: Option<&Path>,
    control: &mut W,
    config: &ServerConfig,
) -> CommandResult
where
    W: AsyncWrite + Unpin,
{
    if !session.is_passive_mode() {
        return CommandResult::failure("Data channel not initialized", CANT_OPEN_DATA, MSG_USE_PASV);
    }

    let result = retrieve_file(session, channel, filename, control, config).await;
    finish_transfer(session, channel).await;
    result
}

async fn retrieve_file<W>(
    session: &Session,
    channel: &DataChannel,
    filename: Option<&Path>,
    control: &mut W,
    config: &ServerConfig,
) -> CommandResult
where
    W: AsyncWrite + Unpin,
{
    let Some(filename) = filename else {
        return CommandResult::failure("Missing filename", FILE_UNAVAILABLE, MSG_OPEN_FAILED);
    };

    let (path, size) =
        match prepare_file_retrieval(session.root(), session.current_directory(), filename).await {
            Ok(found) => found,
            Err(e) => {
                warn!("RETR {} by {} refused: {}", filename.display(), session.peer(), e);
                return CommandResult::failure(e.to_string(), FILE_UNAVAILABLE, MSG_OPEN_FAILED);
            }
        };

    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!("Failed to open file {}: {}", path.display(), e);
            return CommandResult::failure(e.to_string(), FILE_UNAVAILABLE, MSG_OPEN_FAILED);
        }
    };

    let mut data_stream = match channel
        .wait_for_connection(config.data_connection_timeout())
        .await
    {
        Ok(stream) => stream,
        Err(e) => {
            error!("No data connection for client {}: {}", session.peer(), e);
            return CommandResult::failure(e.to_string(), CANT_OPEN_DATA, MSG_NO_DATA_CONN);
        }
    };

    let mark = format!(
        "Opening data connection for {} ({} bytes).",
        filename.display(),
        size
    );
    if let Err(e) = send_provisional(control, OPENING_DATA, &mark).await {
        return CommandResult::failure(e.to_string(), TRANSFER_ABORTED, MSG_ABORTED);
    }

    let outcome = send_file(file, &mut data_stream, &path).await;
    let _ = data_stream.shutdown().await;

    match outcome {
        Ok(_) => CommandResult::success(TRANSFER_COMPLETE, MSG_FILE_SENT),
        Err(e) => CommandResult::failure(e.to_string(), TRANSFER_ABORTED, MSG_ABORTED),
    }
}

/// Handles the NLST command: lists the working directory over the data channel.
async fn handle_cmd_nlst<W>(
    session: &mut Session,
    channel: &DataChannel,
    control: &mut W,
    config: &ServerConfig,
) -> CommandResult
where
    W: AsyncWrite + Unpin,
{
    if !session.is_passive_mode() {
        return CommandResult::failure("Data channel not initialized", CANT_OPEN_DATA, MSG_USE_PASV);
    }

    let result = send_listing(session, channel, control, config).await;
    finish_transfer(session, channel).await;
    result
}

async fn send_listing<W>(
    session: &Session,
    channel: &DataChannel,
    control: &mut W,
    config: &ServerConfig,
) -> CommandResult
where
    W: AsyncWrite + Unpin,
{
    let mut data_stream = match channel
        .wait_for_connection(config.data_connection_timeout())
        .await
    {
        Ok(stream) => stream,
        Err(e) => {
            error!("No data connection for client {}: {}", session.peer(), e);
            return CommandResult::failure(e.to_string(), CANT_OPEN_DATA, MSG_NO_DATA_CONN);
        }
    };

    if let Err(e) = send_provisional(control, OPENING_DATA, MSG_LISTING).await {
        return CommandResult::failure(e.to_string(), TRANSFER_ABORTED, MSG_ABORTED);
    }

    let outcome = list_entries(&mut data_stream, session.current_directory()).await;
    let _ = data_stream.shutdown().await;

    match outcome {
        Ok(count) => {
            info!("Sent {} directory entries to client {}", count, session.peer());
            CommandResult::success(TRANSFER_COMPLETE, MSG_LISTING_SENT)
        }
        Err(e) => {
            error!("Listing for client {} failed: {}", session.peer(), e);
            CommandResult::failure(e.to_string(), LOCAL_ERROR, MSG_LISTING_FAILED)
        }
    }
}

/// Every transfer attempt consumes the passive channel, whatever its outcome.
async fn finish_transfer(session: &mut Session, channel: &DataChannel) {
    session.set_passive_mode(false);
    channel.teardown().await;
}

async fn send_provisional<W>(control: &mut W, code: u16, text: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    control.write_all(format_response(code, text).as_bytes()).await?;
    control.flush().await
}

/// Handles unknown, unsupported or malformed commands.
fn handle_cmd_unknown() -> CommandResult {
    CommandResult::failure("Unknown command", SYNTAX_ERROR, MSG_UNKNOWN)
}
