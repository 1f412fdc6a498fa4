//! Process-group termination.

/// Send SIGTERM to every process in the group led by `pgid`.
#[cfg(unix)]
pub fn terminate_group(pgid: u32) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(pgid).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("process group id {} out of range", pgid),
        )
    })?;
    if pgid <= 1 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("refusing to signal process group {}", pgid),
        ));
    }

    // SAFETY: kill(2) takes plain integers and touches no memory we own.
    let rc = unsafe { libc::kill(-pgid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub fn terminate_group(pgid: u32) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("process group termination is not supported here (group {})", pgid),
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_init_and_zero() {
        assert!(terminate_group(0).is_err());
        assert!(terminate_group(1).is_err());
    }
}
