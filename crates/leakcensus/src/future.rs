use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::scope::SiteScope;
use crate::Site;

pin_project! {
    /// A future whose heap allocations are attributed to one [`Site`].
    ///
    /// The site scope is entered around every `poll` rather than once, so the
    /// attribution follows the future across executor threads.
    ///
    /// Created by the [`track`](crate::track) attribute on `async fn`s.
    pub struct TrackedFuture<F> {
        #[pin]
        inner: F,
        site: Site,
    }
}

impl<F: Future> TrackedFuture<F> {
    pub fn new(site: Site, inner: F) -> Self {
        Self { inner, site }
    }
}

impl<F: Future> Future for TrackedFuture<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _scope = SiteScope::enter(*this.site);
        this.inner.poll(cx)
    }
}
