//! Navigation guards.
//!
//! Guards run one at a time, in registration order, before a navigation
//! commits. Each guard may suspend (for example while awaiting a permission
//! check); the router re-checks after every guard whether a newer navigation
//! has started and, if so, abandons the current one.
//!
//! Any `Fn(GuardContext) -> impl Future<Output = Result<GuardDecision, GuardError>>`
//! is a guard. Use [`sync_guard`] for guards that decide immediately.
//!
//! ```ignore
//! router.register_guard(sync_guard(|ctx| {
//!     let needs_auth = ctx.to().resolved().is_some_and(|r| r.meta().contains_key("requiresAuth"));
//!     Ok(if needs_auth { GuardDecision::redirect("/login") } else { GuardDecision::Allow })
//! }));
//! ```
//!
//! A guard that never resolves stalls its navigation until a newer one
//! supersedes it. Integrators that need a deadline wrap their guard in one.

use std::future::Future;

use futures::future::{FutureExt, LocalBoxFuture};

use crate::error::GuardError;
use crate::route::CurrentRoute;
use crate::target::NavigationTarget;

/// The verdict of a single guard.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
	/// Continue with the next guard.
	Allow,
	/// Abandon this navigation and start one towards the given target.
	Redirect(NavigationTarget),
	/// Abandon this navigation; the current route stays as it is.
	Cancel,
}

impl GuardDecision {
	/// Shorthand for a redirect decision.
	pub fn redirect(target: impl Into<NavigationTarget>) -> Self {
		Self::Redirect(target.into())
	}
}

impl From<bool> for GuardDecision {
	fn from(allow: bool) -> Self {
		if allow { Self::Allow } else { Self::Cancel }
	}
}

/// What started a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTrigger {
	/// An explicit `navigate`, `push` or `replace` call.
	Navigate,
	/// A back/forward traversal that already moved the history stack.
	Pop {
		/// Signed number of entries traversed.
		delta: isize,
	},
	/// The guarded initial navigation performed by `Router::start`.
	Initial,
}

/// Input handed to each guard.
#[derive(Debug, Clone)]
pub struct GuardContext {
	to: CurrentRoute,
	from: CurrentRoute,
	navigation_id: u64,
	trigger: NavigationTrigger,
	redirected_from: Option<String>,
}

impl GuardContext {
	pub(crate) fn new(
		to: CurrentRoute,
		from: CurrentRoute,
		navigation_id: u64,
		trigger: NavigationTrigger,
		redirected_from: Option<String>,
	) -> Self {
		Self {
			to,
			from,
			navigation_id,
			trigger,
			redirected_from,
		}
	}

	/// The route being navigated to.
	pub fn to(&self) -> &CurrentRoute {
		&self.to
	}

	/// The route currently committed.
	pub fn from(&self) -> &CurrentRoute {
		&self.from
	}

	/// Identifier of the navigation being guarded.
	pub fn navigation_id(&self) -> u64 {
		self.navigation_id
	}

	/// What started the navigation.
	pub fn trigger(&self) -> NavigationTrigger {
		self.trigger
	}

	/// The full path of the navigation that redirected here, if any.
	pub fn redirected_from(&self) -> Option<&str> {
		self.redirected_from.as_deref()
	}
}

/// Future returned by [`NavigationGuard::check`].
pub type GuardFuture = LocalBoxFuture<'static, Result<GuardDecision, GuardError>>;

/// A pre-navigation check that may allow, redirect or cancel.
///
/// Returning an error aborts the navigation like [`GuardDecision::Cancel`].
pub trait NavigationGuard {
	/// Evaluates the guard for one navigation.
	fn check(&self, context: GuardContext) -> GuardFuture;
}

impl<F, Fut> NavigationGuard for F
where
	F: Fn(GuardContext) -> Fut,
	Fut: Future<Output = Result<GuardDecision, GuardError>> + 'static,
{
	fn check(&self, context: GuardContext) -> GuardFuture {
		self(context).boxed_local()
	}
}

/// Wraps a synchronous check as a guard.
pub fn sync_guard<F>(check: F) -> impl NavigationGuard
where
	F: Fn(&GuardContext) -> Result<GuardDecision, GuardError> + 'static,
{
	move |context: GuardContext| std::future::ready(check(&context))
}

/// Handle returned by `Router::register_guard`, used to remove the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuardId(pub(crate) u64);
