//! Management of the external sleep-inhibition process.
//!
//! At most one child is alive at a time. The scheduler owns the handle:
//! it starts the child when the sentinel range is selected, health-checks
//! and restarts it at each due fire, and stops it on mode change or exit.

use log::{info, warn};
use std::io;
use std::process::{Child, Command, Stdio};

pub struct Inhibitor {
    program: Option<(String, Vec<String>)>,
    child: Option<Child>,
}

impl Inhibitor {
    /// The platform's native inhibitor. `caffeinate -d -i` on macOS
    /// (-d prevents display sleep, -i prevents idle sleep); other platforms
    /// have none and rely on mouse movement.
    pub fn native() -> Self {
        #[cfg(target_os = "macos")]
        {
            Self::with_command("caffeinate", &["-d", "-i"])
        }
        #[cfg(not(target_os = "macos"))]
        {
            Self {
                program: None,
                child: None,
            }
        }
    }

    /// An inhibitor that is never available; callers fall back to movement.
    pub fn none() -> Self {
        Self {
            program: None,
            child: None,
        }
    }

    /// An inhibitor backed by an arbitrary long-lived command.
    pub fn with_command(program: &str, args: &[&str]) -> Self {
        Self {
            program: Some((
                program.to_string(),
                args.iter().map(|a| a.to_string()).collect(),
            )),
            child: None,
        }
    }

    pub fn available(&self) -> bool {
        self.program.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(|c| c.id())
    }

    /// Spawn the child unless one is already alive.
    pub fn start(&mut self) -> io::Result<()> {
        let Some((program, args)) = self.program.clone() else {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "no sleep inhibitor on this platform",
            ));
        };

        if self.is_alive() {
            return Ok(());
        }

        let child = Command::new(&program)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        info!("sleep inhibitor started: {} (pid {})", program, child.id());
        self.child = Some(child);
        Ok(())
    }

    /// Health check: restart the child if it exited since the last call.
    pub fn ensure_running(&mut self) -> io::Result<()> {
        if self.child.is_some() && !self.is_alive() {
            warn!("sleep inhibitor exited unexpectedly, restarting");
            self.child = None;
        }
        self.start()
    }

    /// Kill and reap the child, if any.
    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            info!("stopping sleep inhibitor (pid {})", child.id());
            if let Err(e) = child.kill() {
                warn!("failed to kill sleep inhibitor: {}", e);
            }
            let _ = child.wait();
        }
    }

    fn is_alive(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

impl Drop for Inhibitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn wait_until_dead(inhibitor: &mut Inhibitor) {
        use std::thread;
        use std::time::Duration;

        for _ in 0..100 {
            if !inhibitor.is_alive() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("inhibitor child did not exit");
    }

    #[test]
    fn test_unavailable_inhibitor_refuses_to_start() {
        let mut inhibitor = Inhibitor::none();
        assert!(!inhibitor.available());
        assert!(inhibitor.start().is_err());
        assert!(inhibitor.pid().is_none());
    }

    #[test]
    #[cfg(unix)] // spawns a real `sleep` child
    fn test_start_is_idempotent_while_alive() {
        let mut inhibitor = Inhibitor::with_command("sleep", &["30"]);
        assert!(inhibitor.available());

        inhibitor.start().unwrap();
        let pid = inhibitor.pid().unwrap();

        inhibitor.start().unwrap();
        assert_eq!(inhibitor.pid(), Some(pid));

        inhibitor.stop();
        assert!(inhibitor.pid().is_none());
    }

    #[test]
    #[cfg(unix)]
    fn test_ensure_running_restarts_dead_child() {
        let mut inhibitor = Inhibitor::with_command("true", &[]);
        inhibitor.start().unwrap();
        let first_pid = inhibitor.pid().unwrap();

        // `true` exits immediately; wait for the child to be reapable.
        wait_until_dead(&mut inhibitor);

        inhibitor.ensure_running().unwrap();
        let second_pid = inhibitor.pid().unwrap();
        assert_ne!(first_pid, second_pid);

        inhibitor.stop();
    }

    #[test]
    #[cfg(unix)]
    fn test_ensure_running_keeps_healthy_child() {
        let mut inhibitor = Inhibitor::with_command("sleep", &["30"]);
        inhibitor.start().unwrap();
        let pid = inhibitor.pid().unwrap();

        inhibitor.ensure_running().unwrap();
        assert_eq!(inhibitor.pid(), Some(pid));

        inhibitor.stop();
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let mut inhibitor = Inhibitor::with_command("sleep", &["30"]);
        inhibitor.stop();
        assert!(inhibitor.pid().is_none());
    }
}
