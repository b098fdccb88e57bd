//! Echo bot example
//!
//! Connects, joins a channel, echoes `!echo <text>` back to where it came
//! from and quits on `!quit` from its owner. Reconnects with backoff if the
//! connection drops.
//!
//! ```text
//! RUST_LOG=slirc_session=debug cargo run --example echo_bot -- irc.libera.chat 6667 echo_bot '#slirc' owner
//! ```

use anyhow::Context;
use slirc_session::prefix::same_nick;
use slirc_session::{Client, Event, Handler, Message, Session, SessionConfig, Verdict};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct EchoBot {
    channel: String,
    owner: String,
    echoed: u64,
}

impl Handler for EchoBot {
    fn on_event(&mut self, session: &mut Session, event: &Event) {
        match event {
            Event::Connect => {
                info!(nick = %session.nick(), "registered, joining {}", self.channel);
                session.join(&self.channel, None);
            }
            Event::Privmsg { prefix, target, text } => {
                if let Some(rest) = text.strip_prefix("!echo ") {
                    self.echoed += 1;
                    session.respond(target, prefix, rest);
                } else if text == "!quit" && same_nick(prefix, &self.owner) {
                    session.quit(Some("asked to leave"));
                    session.kill();
                }
            }
            Event::Invite { channel, .. } if channel == &self.channel => {
                session.join(channel, None);
            }
            Event::Disconnect => info!(echoed = self.echoed, "disconnected"),
            _ => {}
        }
    }

    fn filter_outgoing(&mut self, msg: &mut Message) -> Verdict {
        // never echo anything that looks like a command to another bot
        match msg.trailing.as_deref() {
            Some(text) if msg.is_command("PRIVMSG") && text.starts_with('!') => Verdict::Drop,
            _ => Verdict::Send,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let server = args.next().unwrap_or_else(|| "irc.libera.chat".to_string());
    let port = match args.next() {
        Some(port) => port.parse().context("port must be a number")?,
        None => 6667,
    };
    let nick = args.next().unwrap_or_else(|| "slirc_echo".to_string());
    let channel = args.next().unwrap_or_else(|| "#slirc".to_string());
    let owner = args.next().unwrap_or_default();

    let mut config = SessionConfig::new(&server, port, &nick);
    config.realname = "slirc-session echo bot".to_string();

    let bot = EchoBot {
        channel,
        owner,
        echoed: 0,
    };
    let mut client = Client::new(config, bot);
    client.run().await.context("session ended")?;

    info!(echoed = client.handler().echoed, "bye");
    Ok(())
}
