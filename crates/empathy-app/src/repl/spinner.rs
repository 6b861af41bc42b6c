//! "Thinking..." indicator shown on stderr while the model runs.

use std::io::Write;
use std::time::Duration;

use tokio::task::JoinHandle;

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const TICK: Duration = Duration::from_millis(120);

pub struct Spinner {
    handle: JoinHandle<()>,
}

impl Spinner {
    /// Start animating `label` on its own task. Must be called inside a
    /// tokio runtime.
    pub fn start(label: &'static str) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            for frame in FRAMES.iter().cycle() {
                interval.tick().await;
                let mut err = std::io::stderr().lock();
                let _ = write!(err, "\r{frame} {label}");
                let _ = err.flush();
            }
        });
        Self { handle }
    }

    /// Stop the animation and clear its line.
    pub async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\r\x1b[2K");
        let _ = err.flush();
    }
}
