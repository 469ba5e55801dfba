/// Macro to build a [`JobHandler`](crate::job::JobHandler) from a closure
/// body without writing the future boxing by hand.
///
/// Takes an optional synchronous setup block and a mandatory async logic
/// block. The setup block runs once per job invocation; clone the `Arc`s
/// your logic captures there, since the handler is called for many jobs.
///
/// # Usage
///
/// ```
/// # use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
/// use fleetsweep::handler_fn;
///
/// let counter = Arc::new(AtomicUsize::new(0));
///
/// // With setup block:
/// let handler = handler_fn! {
///     {
///         let counter = counter.clone();
///     }
///     |job| {
///         counter.fetch_add(1, Ordering::SeqCst);
///         tracing::info!(account = %job.account_id(), "processed");
///         Ok(())
///     }
/// };
///
/// // Without setup block:
/// let noop = handler_fn! {
///     |job| {
///         let _ = job.job_data();
///         Ok(())
///     }
/// };
/// # let _: (fleetsweep::FnHandler<_>, fleetsweep::FnHandler<_>) = (handler, noop);
/// ```
#[macro_export]
macro_rules! handler_fn {
    // Matcher 1: optional setup block `{...}` followed by the handler closure
    (
        { $($setup_stmts:stmt);* $(;)? }
        |$job:ident| $main_block:block
    ) => {
        $crate::job::FnHandler::new(move |$job: &$crate::job::JobRequest| {
            $($setup_stmts)*

            ::std::boxed::Box::pin(async move { $main_block })
                as ::std::pin::Pin<::std::boxed::Box<
                    dyn ::std::future::Future<
                        Output = ::core::result::Result<(), $crate::error::JobError>,
                    > + ::core::marker::Send + '_,
                >>
        })
    };

    // Matcher 2: only the handler closure is provided
    (
        |$job:ident| $main_block:block
    ) => {
        $crate::job::FnHandler::new(move |$job: &$crate::job::JobRequest| {
            ::std::boxed::Box::pin(async move { $main_block })
                as ::std::pin::Pin<::std::boxed::Box<
                    dyn ::std::future::Future<
                        Output = ::core::result::Result<(), $crate::error::JobError>,
                    > + ::core::marker::Send + '_,
                >>
        })
    };
}
