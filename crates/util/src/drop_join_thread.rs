//! This module contains the [DropJoinHandle] type, a thin wrapper type around
//! [JoinHandle] that joins the thread when the handle is dropped (RAII style).

use std::io;
use std::ops::{Deref, DerefMut};
use std::thread::{self, JoinHandle};

/// A thin wrapper around [JoinHandle] that joins the thread when the handle is
/// dropped (RAII style).
///
/// Any error in joining the thread on drop will be ignored. Use [Self::join]
/// to get the thread's result (or its panic) instead.
#[derive(Debug)]
pub struct DropJoinHandle<T>(Option<JoinHandle<T>>);

impl<T> DropJoinHandle<T> {
    /// Wait for the thread to finish and return its result, the same as
    /// [JoinHandle::join].
    pub fn join(self) -> thread::Result<T> {
        JoinHandle::from(self).join()
    }
}

impl<T> Deref for DropJoinHandle<T> {
    type Target = JoinHandle<T>;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref().expect(EXPECT_MSG)
    }
}

impl<T> DerefMut for DropJoinHandle<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut().expect(EXPECT_MSG)
    }
}

impl<T> From<JoinHandle<T>> for DropJoinHandle<T> {
    fn from(handle: JoinHandle<T>) -> Self {
        DropJoinHandle(Some(handle))
    }
}

impl<T> From<DropJoinHandle<T>> for JoinHandle<T> {
    fn from(mut handle: DropJoinHandle<T>) -> Self {
        handle.0.take().expect(EXPECT_MSG)
    }
}

impl<T> Drop for DropJoinHandle<T> {
    fn drop(&mut self) {
        // Empty after a conversion into a plain `JoinHandle`.
        if let Some(handle) = self.0.take() {
            _ = handle.join();
        }
    }
}

/// The same as [thread::spawn], but the thread gets a name (which shows up in
/// debug logs and panic messages) and a [DropJoinHandle] is returned instead.
/// Fails only if the OS refuses to create the thread.
pub fn spawn_named<F, T>(name: impl Into<String>, f: F) -> io::Result<DropJoinHandle<T>>
where
    F: FnOnce() -> T,
    F: Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .map(DropJoinHandle::from)
}

const EXPECT_MSG: &str = "The handle should be present.";
