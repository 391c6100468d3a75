use std::cell::RefCell;

/// Per-invocation output sink.
///
/// Proxy invocations buffer their diagnostics so the proxied tool's streams
/// stay clean; a normal flush prints the backlog and switches the sink to
/// pass-through, a proxy flush downgrades it to debug logs. All user-facing
/// lines go to stderr.
pub struct Displayer {
    inner: RefCell<Inner>,
}

enum Inner {
    Direct,
    Buffered(Vec<String>),
}

impl Displayer {
    #[must_use]
    pub fn direct() -> Self {
        Self {
            inner: RefCell::new(Inner::Direct),
        }
    }

    #[must_use]
    pub fn buffered() -> Self {
        Self {
            inner: RefCell::new(Inner::Buffered(Vec::new())),
        }
    }

    pub fn display(&self, message: impl Into<String>) {
        let message = message.into();
        match &mut *self.inner.borrow_mut() {
            Inner::Direct => eprintln!("{message}"),
            Inner::Buffered(pending) => pending.push(message),
        }
    }

    /// Resolve the pending backlog. With `proxy_call` the lines are demoted
    /// to debug logs; otherwise they are printed and the sink stays in
    /// pass-through mode for the rest of the invocation.
    pub fn flush(&self, proxy_call: bool) {
        let mut inner = self.inner.borrow_mut();
        let Inner::Buffered(pending) = &mut *inner else {
            return;
        };

        if proxy_call {
            for message in pending.drain(..) {
                log::debug!("{message}");
            }
        } else {
            for message in pending.drain(..) {
                eprintln!("{message}");
            }
            *inner = Inner::Direct;
        }
    }
}

impl Default for Displayer {
    fn default() -> Self {
        Self::direct()
    }
}
