//! Page routing seam used to send unauthenticated users back to the login entry point.

/// Navigates the host application to its login entry point.
pub trait LoginRouter: Send + Sync {
    /// Redirects to the login entry point.
    fn redirect_to_login(&self);
}

impl<F> LoginRouter for F
where
    F: Fn() + Send + Sync,
{
    fn redirect_to_login(&self) {
        (self)();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[test]
    fn test_closure_router() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let router = move || {
            counter.fetch_add(1, Ordering::SeqCst);
        };

        router.redirect_to_login();
        router.redirect_to_login();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
