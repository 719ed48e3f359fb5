use crate::domains::logger::DynLogger;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Sending half of the "begin navigation now" signal.
#[derive(Clone)]
pub struct StartTrigger {
    sender: mpsc::Sender<()>,
}

impl StartTrigger {
    /// Delivers the signal. Extra deliveries while one is queued are dropped.
    pub fn fire(&self) {
        let _ = self.sender.try_send(());
    }
}

pub fn start_trigger() -> (StartTrigger, mpsc::Receiver<()>) {
    let (sender, receiver) = mpsc::channel(1);
    (StartTrigger { sender }, receiver)
}

/// Fires `trigger` when the operator types `start` (or an empty line) on stdin.
pub fn spawn_stdin_trigger(trigger: StartTrigger, logger: DynLogger) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        logger.info("Type 'start' and press enter to begin the patrol");
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() || line.eq_ignore_ascii_case("start") {
                        trigger.fire();
                    } else {
                        logger.warn(&format!("Unknown command '{}'", line));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    logger.error(&format!("Failed to read stdin: {}", e));
                    break;
                }
            }
        }
    });
}
