// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ctxvars::context::Context;
use ctxvars::{DefaultValue, Error, Registry, RegistryConfig, Slot};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen_test::*;
#[cfg(target_arch = "wasm32")]
wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

fn current() -> Registry<String> {
    let registry = Registry::new("current");
    registry
        .declare("timezone", DefaultValue::Value("UTC".to_string()))
        .unwrap();
    registry.declare("locale", DefaultValue::None).unwrap();
    registry
}

#[cfg_attr(not(target_arch = "wasm32"), test)]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
fn declared_variables() {
    let registry = current();
    assert_eq!(registry.names(), ["timezone", "locale"]);
    assert_eq!(registry.get("timezone"), Ok("UTC".to_string()));
    assert_eq!(
        registry.get("locale"),
        Err(Error::VariableNotSet {
            name: "current.locale".to_string()
        })
    );
    assert_eq!(registry.get_or("locale", "en".to_string()), "en");
    assert_eq!(registry.var("timezone").unwrap().name(), "current.timezone");

    // only variables with a value are listed
    assert_eq!(registry.keys(), ["timezone"]);
    assert_eq!(registry.len(), 1);
    assert!(registry.contains("timezone"));
    assert!(!registry.contains("locale"));
}

#[cfg_attr(not(target_arch = "wasm32"), test)]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
fn declare_twice_fails() {
    let registry = current();
    let err = registry
        .declare("timezone", DefaultValue::None)
        .unwrap_err();
    assert_eq!(
        err,
        Error::AlreadyDeclared {
            registry: "current".to_string(),
            name: "timezone".to_string()
        }
    );

    registry.set("created", "x".to_string()).unwrap();
    assert!(registry.declare("created", DefaultValue::None).is_err());
}

#[cfg_attr(not(target_arch = "wasm32"), test)]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
fn unknown_names() {
    let registry = current();
    assert!(matches!(
        registry.get("nope"),
        Err(Error::UndeclaredVariable { .. })
    ));
    assert_eq!(registry.get_or("nope", "x".to_string()), "x");
    assert!(registry.delete("nope").unwrap_err().is_not_set());
    assert!(registry.var("nope").is_none());
}

#[cfg_attr(not(target_arch = "wasm32"), test)]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
fn set_creates_on_first_write() {
    let registry = current();
    registry.set("user", "alice".to_string()).unwrap();
    assert_eq!(registry.get("user"), Ok("alice".to_string()));
    assert_eq!(registry.names(), ["timezone", "locale", "user"]);

    // the variable exists everywhere, the value only here
    let elsewhere = Context::new().run(|| registry.get("user"));
    assert!(elsewhere.unwrap_err().is_not_set());
}

#[cfg_attr(not(target_arch = "wasm32"), test)]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
fn auto_create_disabled() {
    let registry: Registry<u32> =
        Registry::with_config("strict", RegistryConfig { auto_create: false });
    registry.declare("limit", DefaultValue::Value(10)).unwrap();

    registry.set("limit", 20).unwrap();
    assert_eq!(registry.get("limit"), Ok(20));

    let err = registry.set("other", 1).unwrap_err();
    assert_eq!(
        err,
        Error::UndeclaredVariable {
            registry: "strict".to_string(),
            name: "other".to_string()
        }
    );
    assert!(registry.set_if_not_set("other", 1).is_err());
    assert!(matches!(
        registry.delete("other"),
        Err(Error::UndeclaredVariable { .. })
    ));
    assert_eq!(registry.names(), ["limit"]);
}

#[cfg_attr(not(target_arch = "wasm32"), test)]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
fn delete_pop_and_clear() {
    let registry = current();
    registry.set("locale", "nb".to_string()).unwrap();

    assert_eq!(registry.pop("locale"), Ok("nb".to_string()));
    assert!(registry.pop("locale").unwrap_err().is_not_set());
    assert!(registry.delete("locale").unwrap_err().is_not_set());

    registry.delete("timezone").unwrap();
    // deleted beats the default
    assert!(!registry.contains("timezone"));
    assert!(registry.is_empty());

    registry.update([("timezone", "GMT".to_string()), ("locale", "en".to_string())])
        .unwrap();
    assert_eq!(registry.len(), 2);
    registry.clear();
    assert!(registry.is_empty());
    assert_eq!(registry.names().len(), 2);
}

#[cfg_attr(not(target_arch = "wasm32"), test)]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
fn items_in_declaration_order() {
    let registry = current();
    registry.set("user", "alice".to_string()).unwrap();
    registry.set("locale", "nb".to_string()).unwrap();
    assert_eq!(
        registry.items(),
        [
            ("timezone".to_string(), "UTC".to_string()),
            ("locale".to_string(), "nb".to_string()),
            ("user".to_string(), "alice".to_string()),
        ]
    );
    assert_eq!(registry.values(), ["UTC", "nb", "alice"]);
}

#[cfg_attr(not(target_arch = "wasm32"), test)]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
fn set_if_not_set() {
    let registry = current();
    assert_eq!(registry.set_if_not_set("timezone", "GMT".to_string()), Ok("GMT".to_string()));
    assert_eq!(
        registry.set_if_not_set("timezone", "CET".to_string()),
        Ok("GMT".to_string())
    );
    assert_eq!(registry.set_if_not_set("new", "v".to_string()), Ok("v".to_string()));
}

#[cfg_attr(not(target_arch = "wasm32"), test)]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
fn deferred_default() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let registry: Registry<Vec<u8>> = Registry::new("deferred");
    registry
        .declare(
            "buffer",
            DefaultValue::Deferred(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Vec::new()
            })),
        )
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(registry.get("buffer"), Ok(vec![]));
    assert_eq!(registry.get("buffer"), Ok(vec![]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    Context::new().run(|| {
        assert_eq!(registry.items(), [("buffer".to_string(), vec![])]);
    });
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[cfg_attr(not(target_arch = "wasm32"), test)]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
fn with_values_restores_on_error() {
    let registry: Registry<i32> = Registry::new("scoped");
    registry.declare("a", DefaultValue::None).unwrap();
    registry.declare("b", DefaultValue::Value(0)).unwrap();

    let result = registry.with_values([("a", 1), ("b", 2)], || -> Result<(), String> {
        assert_eq!(registry.get("a"), Ok(1));
        assert_eq!(registry.get("b"), Ok(2));
        Err("failed".to_string())
    });

    assert_eq!(result, Ok(Err("failed".to_string())));
    assert!(registry.get("a").unwrap_err().is_not_set());
    assert_eq!(registry.get("b"), Ok(0));
}

#[cfg_attr(not(target_arch = "wasm32"), test)]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
fn with_values_rolls_back_on_undeclared_name() {
    let registry: Registry<i32> =
        Registry::with_config("strict_scoped", RegistryConfig { auto_create: false });
    registry.declare("a", DefaultValue::Value(0)).unwrap();

    let mut ran = false;
    let result = registry.with_values([("a", 1), ("missing", 2)], || ran = true);
    assert!(matches!(result, Err(Error::UndeclaredVariable { .. })));
    assert!(!ran);
    assert_eq!(registry.get("a"), Ok(0));
    assert!(!registry.var("a").unwrap().is_set());
}

#[cfg_attr(not(target_arch = "wasm32"), test)]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
fn snapshot_and_restore() {
    let registry = current();
    registry.set("locale", "nb".to_string()).unwrap();
    registry.delete("timezone").unwrap();

    let saved = registry.snapshot();
    assert_eq!(saved["current.timezone"], Slot::Deleted);
    assert_eq!(saved["current.locale"], Slot::Value("nb".to_string()));

    registry.set("timezone", "GMT".to_string()).unwrap();
    registry.set("locale", "en".to_string()).unwrap();
    registry.set("created_later", "x".to_string()).unwrap();

    registry.restore(&saved);
    assert!(registry.get("timezone").unwrap_err().is_not_set());
    assert_eq!(registry.get("locale"), Ok("nb".to_string()));
    assert!(registry.get("created_later").unwrap_err().is_not_set());
}

#[cfg(not(target_arch = "wasm32"))]
#[test]
fn concurrent_first_write_creates_one_variable() {
    let registry: Registry<usize> = Registry::new("race");
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let registry = registry.clone();
            std::thread::spawn(move || {
                registry.set("shared", i).unwrap();
                registry.var("shared").unwrap()
            })
        })
        .collect();
    let vars: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(vars.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(registry.names(), ["shared"]);
}
