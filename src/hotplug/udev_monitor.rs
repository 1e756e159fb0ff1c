use std::os::fd::AsRawFd;

/// Blocking udev watcher for drm connector changes
///
/// udev's MonitorSocket is not Send, so this lives on its own thread.
pub struct UdevMonitor {
    socket: udev::MonitorSocket,
}

impl UdevMonitor {
    pub fn new() -> Result<Self, std::io::Error> {
        let socket = udev::MonitorBuilder::new()?
            .match_subsystem_devtype("drm", "drm_minor")?
            .listen()?;

        Ok(Self { socket })
    }

    /// Call `callback` for every add/remove/change event until it returns false
    ///
    /// Only returns on a poll error or when stopped by the callback.
    pub fn run<F>(self, mut callback: F) -> std::io::Error
    where
        F: FnMut(&udev::Event) -> bool,
    {
        info!("output hotplug monitoring started");

        let fd = self.socket.as_raw_fd();

        loop {
            let mut poll_fd = libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            };

            // SAFETY: poll_fd is a valid pollfd for the lifetime of the call
            let poll_result = unsafe { libc::poll(&mut poll_fd, 1, -1) };

            if poll_result < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                error!("poll error: {}", err);
                return err;
            }

            let Some(event) = self.socket.iter().next() else {
                continue;
            };

            match event.event_type() {
                udev::EventType::Add | udev::EventType::Remove | udev::EventType::Change => {
                    debug!("drm event {:?} at {:?}", event.event_type(), event.syspath());
                    if !callback(&event) {
                        return std::io::Error::new(
                            std::io::ErrorKind::Interrupted,
                            "stopped by callback",
                        );
                    }
                }
                _ => {}
            }
        }
    }
}
