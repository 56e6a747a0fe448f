//! Lowers RLIMIT_NOFILE for the whole process, so this file holds a single
//! test and runs in its own binary.

use reactor_http::{Interest, Reactor, Ready};
use std::cell::Cell;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::Duration;

#[test]
fn failed_poll_dispatches_nothing_and_keeps_the_table() {
    let mut original = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    assert_eq!(
        unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut original) },
        0,
        "getrlimit() failed"
    );

    let mut reactor = Reactor::new().expect("reactor");
    let calls = Rc::new(Cell::new(0usize));
    // Never opened, so a successful poll would report POLLNVAL and dispatch.
    for fd in 1000..1032 {
        let seen = calls.clone();
        reactor
            .register(
                fd,
                Interest::READABLE,
                Some(Rc::new(move |_: &mut Reactor, _: RawFd, _: Ready| {
                    seen.set(seen.get() + 1)
                })),
            )
            .expect("register");
    }
    let before = reactor.descriptors();

    // poll(2) fails with EINVAL when nfds exceeds the descriptor limit.
    let lowered = libc::rlimit {
        rlim_cur: 16,
        rlim_max: original.rlim_max,
    };
    assert_eq!(
        unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &lowered) },
        0,
        "setrlimit() failed"
    );

    let result = reactor.turn(Some(Duration::from_millis(10)));

    assert_eq!(
        unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &original) },
        0,
        "restoring the limit failed"
    );

    assert_eq!(result.expect("poll failure is not fatal"), 0);
    assert_eq!(calls.get(), 0);
    assert_eq!(reactor.descriptors(), before);

    // With the limit back, the same table polls and dispatches every entry.
    let dispatched = reactor.turn(Some(Duration::from_millis(10))).expect("turn");
    assert_eq!(dispatched, before.len());
    assert_eq!(calls.get(), before.len());
}
