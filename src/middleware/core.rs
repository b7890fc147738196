use futures::future::BoxFuture;

use crate::server::{Request, Response};

/// A stage in a route's handler chain.
///
/// A stage may mutate the request (e.g. validation writes coerced values back),
/// send the response, or fail. Returning `Err` skips the remaining stages and
/// hands the error to the error-handling layers. Stages after one that sent the
/// response are not run.
pub trait Middleware: Send + Sync {
    fn handle<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// An error-handling layer.
///
/// `Ok(())` means the error was dealt with (usually by sending a response);
/// `Err` forwards an error, the same one or a replacement, to the next layer.
pub trait ErrorHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        err: anyhow::Error,
        req: &'a Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), anyhow::Error>>;
}

/// Adapter turning a synchronous closure into a [`Middleware`].
pub struct FnMiddleware<F>(F);

/// Wrap a synchronous closure as middleware.
///
/// ```rust
/// use brrtgate::middleware::from_fn;
///
/// let stamp = from_fn(|req, _res| {
///     req.locals.insert("seen".into(), true.into());
///     Ok(())
/// });
/// # let _ = stamp;
/// ```
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&mut Request, &mut Response) -> anyhow::Result<()> + Send + Sync,
{
    FnMiddleware(f)
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut Request, &mut Response) -> anyhow::Result<()> + Send + Sync,
{
    fn handle<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        let result = (self.0)(req, res);
        Box::pin(async move { result })
    }
}

/// Adapter turning a synchronous closure into an [`ErrorHandler`].
pub struct FnErrorHandler<F>(F);

pub fn error_handler_fn<F>(f: F) -> FnErrorHandler<F>
where
    F: Fn(anyhow::Error, &Request, &mut Response) -> Result<(), anyhow::Error> + Send + Sync,
{
    FnErrorHandler(f)
}

impl<F> ErrorHandler for FnErrorHandler<F>
where
    F: Fn(anyhow::Error, &Request, &mut Response) -> Result<(), anyhow::Error> + Send + Sync,
{
    fn handle<'a>(
        &'a self,
        err: anyhow::Error,
        req: &'a Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), anyhow::Error>> {
        let result = (self.0)(err, req, res);
        Box::pin(async move { result })
    }
}
