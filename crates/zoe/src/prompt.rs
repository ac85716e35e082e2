//! The system prompt.

use zoe_core::AccountSnapshot;

const TEMPLATE: &str = include_str!("./system_prompt.md");

/// How the session is driven.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// A user types each request.
    Interactive,
    /// A fixed prompt runs on a timer.
    Autonomous,
}

/// Renders the system prompt for one round.
pub fn render(mode: Mode, account: &AccountSnapshot) -> String {
    let mut lines = vec![];
    if !account.address.is_empty() {
        lines.push(format!("Current address: {}", account.address));
        lines.push(format!("Current balance: {} SUI", account.balance));
    }
    let guidance = match mode {
        Mode::Interactive => {
            "I can help you with the tools you've selected. Just let me know \
             what you'd like to do and I'll help guide you through using them."
        }
        Mode::Autonomous => "",
    };
    TEMPLATE
        .replace(
            "{{MODE}}",
            match mode {
                Mode::Interactive => "",
                Mode::Autonomous => " running in autonomous mode",
            },
        )
        .replace("{{ACCOUNT}}", &lines.join("\n"))
        .replace("{{GUIDANCE}}", guidance)
        .trim_end()
        .to_owned()
}
