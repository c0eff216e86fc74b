use std::sync::{Mutex, MutexGuard, PoisonError};

/// Process-wide lock for tests that mutate environment variables.
pub static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Sets environment variables for the life of the guard and restores the
/// previous values on drop. Holds [`ENV_LOCK`] the whole time.
pub struct ScopedEnv {
    saved: Vec<(String, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl ScopedEnv {
    pub fn set(vars: &[(&str, &str)]) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = vars
            .iter()
            .map(|(name, value)| {
                let previous = std::env::var(name).ok();
                std::env::set_var(name, value);
                (name.to_string(), previous)
            })
            .collect();
        Self { saved, _lock: lock }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (name, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(value) => std::env::set_var(&name, value),
                None => std::env::remove_var(&name),
            }
        }
    }
}
