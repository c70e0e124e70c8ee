//! Pre-send hooks.
//!
//! A queued action is a JSON array `[name, args, user_id?, microtime?,
//! is_importing?]`. Before a checked-out action is shipped, the hook
//! registered for its name may rewrite `args` or veto the item. Items that are
//! not action arrays, or whose name has no hook, pass through untouched.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// What a hook decided for one item.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    /// Ship the item with these args.
    Send(Value),
    /// Do not ship; the caller reports the item as skipped.
    Veto,
}

type HookFn = Box<dyn Fn(Value, Option<&Value>) -> HookOutcome + Send + Sync>;

/// Hooks keyed by action name.
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<String, HookFn>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the hook for `action`, replacing any previous one.
    ///
    /// The hook receives the action's args and its user id (if recorded).
    pub fn register<F>(&mut self, action: impl Into<String>, hook: F)
    where
        F: Fn(Value, Option<&Value>) -> HookOutcome + Send + Sync + 'static,
    {
        self.hooks.insert(action.into(), Box::new(hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run the matching hook over one queued value.
    ///
    /// Returns `None` when the item was vetoed.
    pub fn apply(&self, value: Value) -> Option<Value> {
        let Value::Array(mut action) = value else {
            return Some(value);
        };
        let Some(hook) = action
            .first()
            .and_then(Value::as_str)
            .and_then(|name| self.hooks.get(name))
        else {
            return Some(Value::Array(action));
        };

        let args = action.get(1).cloned().unwrap_or(Value::Null);
        match hook(args, action.get(2)) {
            HookOutcome::Send(args) => {
                if action.len() > 1 {
                    action[1] = args;
                } else {
                    action.push(args);
                }
                Some(Value::Array(action))
            }
            HookOutcome::Veto => {
                trace!(action = ?action.first(), "Pre-send hook vetoed item");
                None
            }
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.hooks.keys().collect();
        names.sort();
        f.debug_struct("HookRegistry").field("hooks", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> HookRegistry {
        let mut hooks = HookRegistry::new();
        hooks.register("save_post", |args, _user| {
            let mut args = args;
            args[0]["post_content"] = json!("<filtered>");
            HookOutcome::Send(args)
        });
        hooks.register("private_thing", |_args, _user| HookOutcome::Veto);
        hooks.register("per_user", |args, user| match user {
            Some(id) if id == &json!(1) => HookOutcome::Veto,
            _ => HookOutcome::Send(args),
        });
        hooks
    }

    #[test]
    fn rewrites_args() {
        let out = registry()
            .apply(json!(["save_post", [{"post_content": "raw"}], 3, "1.5", false]))
            .unwrap();
        assert_eq!(
            out,
            json!(["save_post", [{"post_content": "<filtered>"}], 3, "1.5", false])
        );
    }

    #[test]
    fn vetoes() {
        assert!(registry().apply(json!(["private_thing", [1]])).is_none());
    }

    #[test]
    fn sees_user_id() {
        let hooks = registry();
        assert!(hooks.apply(json!(["per_user", [], 1])).is_none());
        assert!(hooks.apply(json!(["per_user", [], 2])).is_some());
        assert!(hooks.apply(json!(["per_user", []])).is_some());
    }

    #[test]
    fn unknown_or_malformed_pass_through() {
        let hooks = registry();
        for value in [
            json!(["no_hook", [1]]),
            json!({"not": "an action"}),
            json!([42, "numeric name"]),
            json!([]),
        ] {
            assert_eq!(hooks.apply(value.clone()), Some(value));
        }
    }

    #[test]
    fn missing_args_are_appended() {
        let mut hooks = HookRegistry::new();
        hooks.register("bare", |_args, _| HookOutcome::Send(json!(["added"])));
        assert_eq!(hooks.apply(json!(["bare"])), Some(json!(["bare", ["added"]])));
    }
}
