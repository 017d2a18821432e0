use std::io;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

/// Spawn `body` on a thread built by `builder`, moving `value` onto it.
///
/// If the thread cannot be started, `value` is handed back with the error
/// instead of being dropped with the closure. It is only `None` if the
/// closure somehow ran before the spawn reported failure.
pub(crate) fn spawn_with<T, F>(
    builder: thread::Builder,
    value: T,
    body: F,
) -> Result<thread::JoinHandle<()>, (Option<T>, io::Error)>
where
    T: Send + 'static,
    F: FnOnce(T) + Send + 'static,
{
    let slot = Arc::new(Mutex::new(Some(value)));
    let thread_slot = Arc::clone(&slot);

    let spawned = builder.spawn(move || {
        let value = thread_slot.lock().take();
        if let Some(value) = value {
            body(value);
        }
    });

    spawned.map_err(|e| {
        let value = slot.lock().take();
        (value, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn value_reaches_the_thread() {
        let (tx, rx) = bounded(1);
        let handle = spawn_with(thread::Builder::new(), 41u32, move |v| tx.send(v + 1).unwrap()).unwrap();
        handle.join().unwrap();
        assert_eq!(rx.recv().unwrap(), 42);
    }

    #[test]
    fn value_comes_back_when_spawn_fails() {
        // no address space can hold this stack
        let builder = thread::Builder::new().stack_size(1usize << 62);
        match spawn_with(builder, String::from("engine"), |_| {}) {
            Ok(_) => panic!("thread with an impossible stack was spawned"),
            Err((value, _)) => assert_eq!(value.as_deref(), Some("engine")),
        }
    }
}
