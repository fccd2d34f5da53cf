//! Spawner for the browser event loop.

use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};

/// [`LocalSpawn`] implementation that hands futures to the browser's
/// microtask queue through `wasm_bindgen_futures::spawn_local`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
	fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
		wasm_bindgen_futures::spawn_local(future);
		Ok(())
	}
}
