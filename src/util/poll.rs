use std::{
    future::Future,
    task::{Context, Poll},
    thread,
    time::Duration,
};

use futures::task::noop_waker_ref;

/// Drives a future to completion on the current thread. The transport
/// contract is synchronous, so SDK calls are waited on in place.
pub fn block_on<Fut, T>(future: Fut) -> T
where
    Fut: Future<Output = T>,
{
    let mut future = Box::pin(future);
    let mut context = Context::from_waker(noop_waker_ref());

    loop {
        match future.as_mut().poll(&mut context) {
            Poll::Ready(value) => {
                return value;
            }
            Poll::Pending => {
                thread::sleep(Duration::from_millis(10));
            }
        }
    }
}
