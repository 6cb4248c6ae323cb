use clap::Parser;

pub const DEFAULT_USER_ID: &str = "user_123";
pub const DEFAULT_SESSION_ID: &str = "session_456";
pub const DEFAULT_MESSAGE: &str = "Meu nome é junior";

#[derive(Debug, Parser)]
#[command(name = "soil-advisor")]
#[command(about = "Ask the soil fertilization advisor", long_about = None)]
pub struct Cli {
    /// User the conversation belongs to
    #[arg(short, long, default_value = DEFAULT_USER_ID)]
    pub user_id: String,

    /// Session to continue
    #[arg(short, long, default_value = DEFAULT_SESSION_ID)]
    pub session_id: String,

    /// Message to send; repeat to send several in order
    #[arg(short, long = "message")]
    pub messages: Vec<String>,
}

impl Cli {
    /// The messages to send, falling back to the greeting smoke test.
    pub fn messages(&self) -> Vec<String> {
        if self.messages.is_empty() {
            vec![DEFAULT_MESSAGE.to_string()]
        } else {
            self.messages.clone()
        }
    }
}
