//! chatbocs: terminal front end for the Chat-BOCS backend.
//! Without a question argument it runs an interactive session, one stdin line
//! per question. With a question it prints the first answer and exits.

use chatbocs_client::config::{self, Config, ConfigError};
use chatbocs_client::{
    logging, AskClient, ChatMessage, EventRouter, Inbound, Origin, ResponseData,
    SessionController, WsTransport,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

type Session = SessionController<WsTransport>;

#[derive(Parser)]
#[command(name = "chatbocs", about = "Chat with the Chat-BOCS backend", version)]
struct Args {
    /// Config file (default: ~/.chatbocs/config.yaml)
    #[arg(long, env = "CHATBOCS_CONFIG")]
    config: Option<PathBuf>,

    /// WebSocket URL, overrides `server.socket_url`
    #[arg(long)]
    url: Option<String>,

    /// Ask once over HTTP (`POST <base>/ask`) instead of the socket
    #[arg(long, requires = "question")]
    http: bool,

    /// Log level, overrides `log.level`
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Question to ask once; omit for an interactive session
    question: Option<String>,
}

fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    // An explicit path must exist; the default one may not.
    match path {
        Some(p) => config::load(p),
        None => match config::default_config_path() {
            Some(p) => config::load_or_default(&p),
            None => Ok(Config::default()),
        },
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let cfg = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(
        args.log_level.as_deref().unwrap_or(cfg.log_level()),
        args.json_logs || cfg.json_logs(),
    );

    // One thread: socket tasks, stdin and the session share it.
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = rt.block_on(run(args, cfg));
    // A blocking stdin read may still be outstanding; don't wait for it.
    rt.shutdown_background();
    code
}

async fn run(args: Args, cfg: Config) -> ExitCode {
    if args.http {
        let question = args.question.as_deref().unwrap_or_default();
        return ask_http(cfg.http_base(), question).await;
    }

    let url = args.url.as_deref().unwrap_or(cfg.socket_url());
    let (transport, inbound) = match WsTransport::connect(url).await {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let session = SessionController::with_welcome(transport, cfg.welcome());
    let mut router = EventRouter::new();
    Session::bind(&mut router);

    match args.question {
        Some(question) => ask_once(session, router, inbound, &question).await,
        None => chat(session, router, inbound).await,
    }
}

fn print_message(message: &ChatMessage) {
    match message.origin() {
        Origin::Bot => println!("bot> {}", message.text()),
        Origin::User => {}
    }
}

/// Print the messages appended since the log held `seen` entries.
fn print_new(session: &Session, seen: usize) {
    for message in &session.messages()[seen..] {
        print_message(message);
    }
}

async fn ask_once(
    mut session: Session,
    mut router: EventRouter<Session>,
    mut inbound: Inbound,
    question: &str,
) -> ExitCode {
    if !session.submit(question) {
        eprintln!("Error: no question provided");
        return ExitCode::FAILURE;
    }
    let seen = session.messages().len();

    while session.pending_request() {
        match inbound.next().await {
            Some(frame) => {
                router.dispatch(&mut session, &frame);
            }
            None => {
                eprintln!("Error: disconnected before an answer arrived");
                return ExitCode::FAILURE;
            }
        }
    }

    print_new(&session, seen);
    let mut transport = session.into_transport();
    transport.close().await;
    ExitCode::SUCCESS
}

async fn chat(
    mut session: Session,
    mut router: EventRouter<Session>,
    mut inbound: Inbound,
) -> ExitCode {
    print_new(&session, 0);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    // After stdin EOF, stay until the pending answer arrives.
    while stdin_open || session.pending_request() {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    session.set_input(line);
                    if session.submit_input() {
                        eprintln!("…");
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    stdin_open = false;
                }
            },
            frame = inbound.next() => match frame {
                Some(frame) => {
                    let seen = session.messages().len();
                    router.dispatch(&mut session, &frame);
                    print_new(&session, seen);
                }
                None => {
                    eprintln!("Disconnected.");
                    break;
                }
            },
        }
    }

    let mut transport = session.into_transport();
    transport.close().await;
    ExitCode::SUCCESS
}

async fn ask_http(base: &str, question: &str) -> ExitCode {
    if question.trim().is_empty() {
        eprintln!("Error: no question provided");
        return ExitCode::FAILURE;
    }
    let client = AskClient::new(base);
    match client.ask(question).await {
        Ok(ResponseData::Answer { response }) => {
            println!("bot> {}", response);
            ExitCode::SUCCESS
        }
        Ok(ResponseData::Failure { error }) => {
            eprintln!("Server error: {}", error);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
