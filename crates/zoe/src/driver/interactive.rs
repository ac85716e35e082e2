use std::io::{self, Write};

use tokio::io::AsyncBufRead;
use zoe_core::RoundError;

use crate::menu::read_line;
use crate::session::Session;

/// Writes a failed round the way drivers report it to the user.
///
/// Numeric faults in the model output get a fixed message.
pub fn report_error<W: Write>(
    output: &mut W,
    err: &RoundError,
) -> io::Result<()> {
    if err.is_invalid_number() {
        writeln!(output, "Error: Invalid number conversion")
    } else {
        writeln!(output, "Error: {err}")
    }
}

/// Runs one round per line read from `input` until the input ends.
///
/// Streamed text is expected to reach the terminal through the session's
/// event callback, between the `Assistant:` label and the blank line
/// written here. Failed rounds are reported and the loop goes on.
pub async fn run_interactive<R, W>(
    session: &mut Session,
    input: &mut R,
    output: &mut W,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        write!(output, "You: ")?;
        output.flush()?;
        let Some(line) = read_line(input).await? else {
            break;
        };

        write!(output, "\nAssistant: ")?;
        output.flush()?;
        match session.send_message(&line).await {
            Ok(outcome) => {
                debug!(
                    "round ended after {} model calls ({:?})",
                    outcome.model_calls, outcome.end
                );
            }
            Err(err) => {
                warn!("round failed: {err}");
                report_error(output, &err)?;
            }
        }
        write!(output, "\n\n")?;
        output.flush()?;
    }
    Ok(())
}
