//! Cross-process wait/wake on 32-bit words in a shared mapping
//!
//! On Linux this is a shared (non-private) futex, so waiters in other
//! processes mapping the same file are woken too. Elsewhere waiters poll.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

#[cfg(target_os = "linux")]
mod imp {
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    /// Returns false when the wait timed out
    pub fn wait(word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> bool {
        let ts = timeout.map(|t| libc::timespec {
            tv_sec: t.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_nsec: t.subsec_nanos() as libc::c_long,
        });
        let ts_ptr = ts
            .as_ref()
            .map_or(std::ptr::null(), |ts| ts as *const libc::timespec);
        // SAFETY: `word` is a valid aligned u32 for the duration of the call;
        // the kernel only reads it and the timespec.
        let rc = unsafe {
            libc::syscall(
                libc::SYS_futex,
                word.as_ptr(),
                libc::FUTEX_WAIT,
                expected,
                ts_ptr,
                std::ptr::null::<u32>(),
                0u32,
            )
        };
        !(rc == -1 && std::io::Error::last_os_error().raw_os_error() == Some(libc::ETIMEDOUT))
    }

    pub fn wake_all(word: &AtomicU32) -> usize {
        // SAFETY: FUTEX_WAKE does not dereference anything but the word.
        let rc = unsafe {
            libc::syscall(
                libc::SYS_futex,
                word.as_ptr(),
                libc::FUTEX_WAKE,
                i32::MAX,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            )
        };
        if rc < 0 {
            0
        } else {
            rc as usize
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};

    const POLL_INTERVAL: Duration = Duration::from_millis(1);

    pub fn wait(word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        while word.load(Ordering::Acquire) == expected {
            if deadline.map_or(false, |d| Instant::now() >= d) {
                return false;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        true
    }

    pub fn wake_all(_word: &AtomicU32) -> usize {
        0
    }
}

/// Sleep while `word` still holds `expected`
///
/// May return early (spurious wakeups, signals, or the word already differs).
/// Returns false only when `timeout` elapsed.
pub fn wait(word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> bool {
    imp::wait(word, expected, timeout)
}

/// Wake every waiter blocked on `word`, returning how many were woken
pub fn wake_all(word: &AtomicU32) -> usize {
    imp::wake_all(word)
}

/// Block until `word` differs from `old`, returning the new value
///
/// Returns `None` when `timeout` elapses first. `None` as timeout waits
/// forever.
pub fn wait_for_change(word: &AtomicU32, old: u32, timeout: Option<Duration>) -> Option<u32> {
    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        let current = word.load(Ordering::Acquire);
        if current != old {
            return Some(current);
        }
        let remaining = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return None;
                }
                Some(deadline - now)
            }
            None => None,
        };
        wait(word, old, remaining);
    }
}
