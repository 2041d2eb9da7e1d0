#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Hydrator dispatch tests.
//!
//! Runs `ConfigurableHydrator` against the sample user/admin entities and
//! their serde-backed hydrators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use serde_json::json;
use sift_kernel::container::ServiceMap;
use sift_kernel::error::HydrationError;
use sift_kernel::hydrator::{
    ConfigurableHydrator, Entity, Extractable, Hydrator, HydratorEntry, row_data,
};
use sift_test_utils::assert::row_has;
use sift_test_utils::{
    ADMIN_CLASS, AUDITABLE_INTERFACE, IDENTITY_INTERFACE, TestAdmin, TestUser, USER_CLASS,
    admin_hydrator, is_user_named, test_admin, test_hierarchy, test_user, user_hydrator, user_row,
};

fn registry() -> ConfigurableHydrator {
    ConfigurableHydrator::default()
        .with_hierarchy(test_hierarchy())
        .with_hydrator(USER_CLASS, user_hydrator())
        .with_hydrator(ADMIN_CLASS, admin_hydrator())
}

#[test]
fn test_exact_class_match() {
    let registry = registry();
    let admin = test_admin("root", 9);
    let row = serde_json::Value::Object(registry.extract(&admin).unwrap());
    row_has(&row, "level", &json!(9));
}

#[test]
fn test_exact_match_preferred_over_ancestor() {
    let registry = registry();
    let exact = registry.get_hydrator(ADMIN_CLASS).unwrap();
    let ancestor = registry.get_hydrator(USER_CLASS).unwrap();
    assert!(!Arc::ptr_eq(&exact, &ancestor));
    assert!(matches!(
        registry.find_hydrator(ADMIN_CLASS),
        Some(HydratorEntry::Instance(h)) if Arc::ptr_eq(h, &exact)
    ));
}

#[test]
fn test_ancestor_and_interface_matches_follow_registration_order() {
    let user: Arc<dyn Hydrator> = user_hydrator();
    let admin: Arc<dyn Hydrator> = admin_hydrator();

    let interface_first = ConfigurableHydrator::default()
        .with_hierarchy(test_hierarchy())
        .with_hydrator(AUDITABLE_INTERFACE, Arc::clone(&admin))
        .with_hydrator(USER_CLASS, Arc::clone(&user));
    let resolved = interface_first.get_hydrator(ADMIN_CLASS).unwrap();
    assert!(Arc::ptr_eq(&resolved, &admin));

    let parent_first = ConfigurableHydrator::default()
        .with_hierarchy(test_hierarchy())
        .with_hydrator(USER_CLASS, Arc::clone(&user))
        .with_hydrator(AUDITABLE_INTERFACE, Arc::clone(&admin));
    let resolved = parent_first.get_hydrator(ADMIN_CLASS).unwrap();
    assert!(Arc::ptr_eq(&resolved, &user));
}

#[test]
fn test_transitive_interface_match() {
    let registry = ConfigurableHydrator::default()
        .with_hierarchy(test_hierarchy())
        .with_hydrator(IDENTITY_INTERFACE, user_hydrator());
    assert!(registry.find_hydrator(ADMIN_CLASS).is_some());
    assert!(registry.find_hydrator("app.invoice").is_none());
}

#[test]
fn test_not_configured() {
    let registry = registry();
    let err = registry.create(json!({"id": 1}), "app.invoice").err().unwrap();
    assert_eq!(err.to_string(), "no hydrator configured for class 'app.invoice'");
}

#[test]
fn test_ancestor_hydrator_rejects_foreign_entity() {
    let registry = ConfigurableHydrator::default()
        .with_hierarchy(test_hierarchy())
        .with_hydrator(USER_CLASS, user_hydrator());
    let admin = test_admin("root", 1);
    assert!(matches!(
        registry.extract(&admin),
        Err(HydrationError::EntityMismatch { ref expected, ref actual })
            if expected == USER_CLASS && actual == ADMIN_CLASS
    ));
}

#[test]
fn test_service_hydrators_resolve_once_across_threads() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&constructed);
    let container = ServiceMap::<dyn Hydrator>::new().with("hydrator.user", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        user_hydrator()
    });
    let registry = ConfigurableHydrator::new(Arc::new(container))
        .with_hierarchy(test_hierarchy())
        .with_service(USER_CLASS, "hydrator.user");

    let resolved: Vec<Arc<dyn Hydrator>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| registry.get_hydrator(USER_CLASS).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(resolved.iter().all(|h| Arc::ptr_eq(h, &resolved[0])));
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_service_constructor_may_resolve_other_classes() {
    let shared: Arc<OnceLock<Arc<ConfigurableHydrator>>> = Arc::new(OnceLock::new());
    let lookup = Arc::clone(&shared);
    let container = ServiceMap::<dyn Hydrator>::new().with("hydrator.admin", move || {
        // Admin rows embed users, so the admin hydrator needs the user one.
        lookup.get().unwrap().get_hydrator(USER_CLASS).unwrap();
        admin_hydrator()
    });
    let registry = Arc::new(
        ConfigurableHydrator::new(Arc::new(container))
            .with_hierarchy(test_hierarchy())
            .with_hydrator(USER_CLASS, user_hydrator())
            .with_service(ADMIN_CLASS, "hydrator.admin"),
    );
    assert!(shared.set(Arc::clone(&registry)).is_ok());

    let admin = registry
        .create(json!({"name": "root", "level": 5}), ADMIN_CLASS)
        .unwrap();
    assert_eq!(admin.downcast_ref::<TestAdmin>().unwrap().level, 5);
}

#[test]
fn test_subclass_is_not_created_by_ancestor_hydrator() {
    let registry = ConfigurableHydrator::default()
        .with_hierarchy(test_hierarchy())
        .with_hydrator(USER_CLASS, user_hydrator());
    let row = row_data(json!({"name": "root"}));

    let mismatch = |result: Result<Box<dyn Entity>, HydrationError>| {
        matches!(
            result,
            Err(HydrationError::EntityMismatch { ref expected, ref actual })
                if expected == USER_CLASS && actual == ADMIN_CLASS
        )
    };
    assert!(mismatch(registry.hydrate(&row, ADMIN_CLASS)));
    assert!(mismatch(registry.create(json!({"name": "root"}), ADMIN_CLASS)));

    // The registered class itself is unaffected.
    let mut user = test_user("ada");
    registry.hydrate_into(&row, &mut user).unwrap();
    assert_eq!(user.name, "root");
}

#[test]
fn test_create_from_raw_row() {
    let registry = registry();
    let entity = registry.create(user_row("ada"), USER_CLASS).unwrap();
    assert!(is_user_named(entity.as_ref(), "ada"));
    assert_eq!(
        entity.downcast_ref::<TestUser>().unwrap().email,
        "ada@example.com"
    );
}

#[test]
fn test_create_passes_existing_entity_through() {
    let registry = registry();
    let entity: Box<dyn Entity> = Box::new(test_user("ada").with_role("editor"));
    let before = std::ptr::from_ref::<dyn Entity>(entity.as_ref()).cast::<()>();

    // The class argument is irrelevant for existing entities.
    let created = registry.create(entity, "app.invoice").unwrap();
    let after = std::ptr::from_ref::<dyn Entity>(created.as_ref()).cast::<()>();

    assert_eq!(before, after);
    assert_eq!(
        created.downcast_ref::<TestUser>().unwrap().roles,
        vec!["editor".to_string()]
    );
}

#[test]
fn test_hydrate_class_and_instance() {
    let registry = registry();

    let fresh = registry
        .hydrate(&row_data(json!({"name": "root", "level": 3})), ADMIN_CLASS)
        .unwrap();
    let admin = fresh.downcast_ref::<TestAdmin>().unwrap();
    assert_eq!((admin.name.as_str(), admin.level), ("root", 3));

    let mut user = test_user("ada");
    registry
        .hydrate_into(&row_data(json!({"email": "ada@lovelace.dev"})), &mut user)
        .unwrap();
    assert_eq!(user.name, "ada");
    assert_eq!(user.email, "ada@lovelace.dev");
}

#[test]
fn test_extract_all_nested_and_flat() {
    let registry = registry();
    let (a, b, c) = (test_user("a"), test_user("b"), test_admin("c", 2));

    let flat = [Extractable::Entity(&a), Extractable::Entity(&c)];
    let rows = registry.extract_all(&flat, 1).unwrap();
    assert_eq!(rows.len(), 2);
    row_has(&rows[0], "name", &json!("a"));
    row_has(&rows[1], "level", &json!(2));

    let nested = [
        Extractable::Collection(vec![Extractable::Entity(&a), Extractable::Entity(&b)]),
        Extractable::Collection(vec![Extractable::Entity(&c)]),
    ];
    let rows = registry.extract_all(&nested, 1).unwrap();
    assert_eq!(rows.len(), 2);
    let first = rows[0].as_array().unwrap();
    assert_eq!(first.len(), 2);
    row_has(&first[1], "name", &json!("b"));
    row_has(&rows[1][0], "name", &json!("c"));

    let deeper = [Extractable::Collection(vec![Extractable::Collection(vec![
        Extractable::Entity(&a),
    ])])];
    assert!(matches!(
        registry.extract_all(&deeper, 1),
        Err(HydrationError::DepthExceeded)
    ));
    assert_eq!(registry.extract_all(&deeper, 2).unwrap()[0][0][0]["name"], json!("a"));
}
