mod fixtures;

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use modhub_kernel::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_load() {
        let tracker = Tracker::new();
        let manager = manager_with([tracked(
            "auth",
            &[],
            &tracker,
            Pace::Delay(Duration::from_millis(30)),
        )]);

        let callers: Vec<_> = (0..16)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.ensure_loaded("auth").await })
            })
            .collect();
        for caller in callers {
            caller.await.unwrap().unwrap();
        }

        assert_eq!(tracker.loads(), 1);
        assert_eq!(tracker.registrations(), 1);
        assert_eq!(manager.loaded(), ["auth"]);

        manager.ensure_loaded("auth").await.unwrap();
        assert_eq!(tracker.loads(), 1, "loaded features return without reloading");
    }

    #[tokio::test]
    async fn test_dependencies_load_first() {
        let tracker = Tracker::new();
        let manager = manager_with([
            counted("reports", &["user", "auth"], &tracker),
            counted("user", &["auth"], &tracker),
            counted("auth", &[], &tracker),
        ]);

        manager.ensure_loaded("reports").await.unwrap();

        assert_eq!(tracker.journal(), ["auth", "user", "reports"]);
        assert_eq!(manager.loaded(), ["auth", "user", "reports"]);
        assert_eq!(tracker.loads(), 3, "shared dependency loads once");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_diamond_dependency_loads_once() {
        let tracker = Tracker::new();
        let delay = Pace::Delay(Duration::from_millis(10));
        let manager = manager_with([
            tracked("base", &[], &tracker, delay.clone()),
            tracked("left", &["base"], &tracker, delay.clone()),
            tracked("right", &["base"], &tracker, delay),
            counted("top", &["left", "right"], &tracker),
        ]);

        manager.ensure_loaded("top").await.unwrap();

        assert_eq!(tracker.loads(), 4);
        let journal = tracker.journal();
        assert_eq!(journal.first().map(String::as_str), Some("base"));
        assert_eq!(journal.last().map(String::as_str), Some("top"));
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let tracker = Tracker::new();
        let manager = manager_with([flaky("billing", 1, &tracker)]);

        let err = manager.ensure_loaded("billing").await.unwrap_err();
        assert!(matches!(err, FeatureError::LoaderFailed { ref name, .. } if name == "billing"));
        assert!(err.to_string().contains("backend unavailable"));
        assert!(!manager.is_loaded("billing"));
        assert_eq!(manager.status("billing"), FeatureStatus::Registered);

        manager.ensure_loaded("billing").await.unwrap();
        assert_eq!(tracker.loads(), 2);
        assert_eq!(tracker.registrations(), 1);
        assert!(manager.is_loaded("billing"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_receive_the_same_error() {
        let manager = manager_with([rejecting("vault", Duration::from_millis(20))]);

        let (first, second) =
            tokio::join!(manager.ensure_loaded("vault"), manager.ensure_loaded("vault"));

        let (
            Err(FeatureError::RegistrationFailed { source: a, .. }),
            Err(FeatureError::RegistrationFailed { source: b, .. }),
        ) = (first, second)
        else {
            panic!("both callers should see the registration failure");
        };

        assert!(Arc::ptr_eq(&a, &b), "one failure object is shared by all waiters");
        let hook_error = a.downcast_ref::<HookError>().expect("hook error is preserved");
        assert_eq!(hook_error.0, "vault");
        assert!(!manager.is_loaded("vault"));
    }

    #[tokio::test]
    async fn test_unknown_feature_lists_registered_names() {
        let tracker = Tracker::new();
        let manager = manager_with([counted("auth", &[], &tracker), counted("user", &[], &tracker)]);

        let err = manager.ensure_loaded("admin").await.unwrap_err();

        let FeatureError::UnknownFeature { name, registered, .. } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(name, "admin");
        assert_eq!(registered, &["auth", "user"]);
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn test_dependency_failure_blocks_dependent() {
        let tracker = Tracker::new();
        let manager = manager_with([
            counted("user", &["auth"], &tracker),
            rejecting("auth", Duration::ZERO),
        ]);

        let err = manager.ensure_loaded("user").await.unwrap_err();

        assert!(matches!(
            &err,
            FeatureError::DependencyFailed { feature, dependency, .. }
                if feature == "user" && dependency == "auth"
        ));
        assert!(matches!(err.root_cause(), FeatureError::RegistrationFailed { .. }));
        assert_eq!(tracker.loads(), 0, "dependent loader never ran");
        assert!(manager.loaded().is_empty());
    }

    #[tokio::test]
    async fn test_missing_dependency_is_reported() {
        let tracker = Tracker::new();
        let manager = manager_with([counted("user", &["ghost"], &tracker)]);

        let err = manager.ensure_loaded("user").await.unwrap_err();

        assert!(matches!(err.root_cause(), FeatureError::UnknownFeature { name, .. } if name == "ghost"));
        assert!(!manager.is_loaded("user"));
        assert_eq!(manager.status("user"), FeatureStatus::Registered);
    }

    #[tokio::test]
    async fn test_cycles_are_rejected() {
        let tracker = Tracker::new();
        let manager = manager_with([
            counted("a", &["b"], &tracker),
            counted("b", &["a"], &tracker),
            counted("c", &["a"], &tracker),
        ]);

        let err = manager.ensure_loaded("a").await.unwrap_err();
        assert!(matches!(&err, FeatureError::CircularDependency { path, .. } if path == &["a", "b", "a"]));

        let err = manager.ensure_loaded("c").await.unwrap_err();
        assert!(matches!(err.root_cause(), FeatureError::CircularDependency { .. }));
        assert_eq!(tracker.loads(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_preload_fails_fast_but_keeps_loading() {
        let tracker = Tracker::new();
        let gate = Arc::new(Notify::new());
        let manager = manager_with([
            tracked("search", &[], &tracker, Pace::Gate(Arc::clone(&gate))),
            rejecting("broken", Duration::ZERO),
        ]);

        let err = manager.preload(["search", "broken"]).await.unwrap_err();
        assert!(matches!(err, FeatureError::RegistrationFailed { ref name, .. } if name == "broken"));
        assert_eq!(manager.status("search"), FeatureStatus::Loading);

        gate.notify_one();
        wait_for_status(&manager, "search", FeatureStatus::Loaded).await;
        assert_eq!(tracker.loads(), 1);
    }

    #[tokio::test]
    async fn test_preload_loads_everything() {
        let tracker = Tracker::new();
        let manager = manager_with([
            counted("auth", &[], &tracker),
            counted("user", &["auth"], &tracker),
            counted("reports", &["user"], &tracker),
        ]);

        manager.preload(["reports", "auth"]).await.unwrap();
        manager.preload(Vec::<String>::new()).await.unwrap();

        assert_eq!(manager.loaded().len(), 3);
        assert_eq!(tracker.registrations(), 3);
    }

    #[tokio::test]
    async fn test_malformed_module_is_rejected() {
        let manager = manager_with([FeatureDescriptor::builder("hollow")
            .loader(|| async { Ok::<_, BoxError>(FeatureModule::named("hollow")) })]);

        let err = manager.ensure_loaded("hollow").await.unwrap_err();

        assert!(matches!(err, FeatureError::MalformedModule { .. }));
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn test_panicking_loader_becomes_internal_error() {
        let manager = manager_with([FeatureDescriptor::builder("volatile").loader(|| async {
            if true {
                panic!("disk on fire");
            }
            Ok::<_, BoxError>(FeatureModule::named("volatile").on_register(|_| Ok(())))
        })]);

        let err = manager.ensure_loaded("volatile").await.unwrap_err();

        assert!(matches!(err, FeatureError::Internal { .. }));
        assert!(err.to_string().contains("disk on fire"));
        assert_eq!(manager.status("volatile"), FeatureStatus::Registered);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timeout_does_not_cancel_the_load() {
        let tracker = Tracker::new();
        let gate = Arc::new(Notify::new());
        let manager = manager_with([tracked("slow", &[], &tracker, Pace::Gate(Arc::clone(&gate)))]);

        let err = manager.ensure_loaded_within("slow", Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, FeatureError::Timeout { ref name, .. } if name == "slow"));
        assert!(err.is_retriable());
        assert_eq!(manager.status("slow"), FeatureStatus::Loading);

        gate.notify_one();
        manager.ensure_loaded("slow").await.unwrap();
        assert_eq!(tracker.loads(), 1);
    }

    #[tokio::test]
    async fn test_resolve_loads_and_returns_service() {
        const GREETING: ServiceKey<String> = ServiceKey::new("hello.greeting");
        const MISSING: ServiceKey<String> = ServiceKey::new("hello.missing");
        let manager = manager_with([greeter("hello", GREETING, "hi", Pace::Instant)]);

        let greeting = manager.resolve("hello", GREETING).await.unwrap();
        assert_eq!(greeting.as_str(), "hi");

        let err = manager.resolve("hello", MISSING).await.unwrap_err();
        assert!(matches!(err, FeatureError::Container { source: ContainerError::NotBound { .. }, .. }));
    }

    #[tokio::test]
    async fn test_introspection_snapshot() {
        let tracker = Tracker::new();
        let manager = manager_with([
            counted("auth", &[], &tracker),
            FeatureDescriptor::builder("user")
                .description("User profiles")
                .version("1.2.0")
                .tag("core")
                .depends_on("auth")
                .loader(|| async { Ok::<_, BoxError>(FeatureModule::named("user").on_register(|_| Ok(()))) }),
        ]);

        assert_eq!(manager.registered(), ["auth", "user"]);
        assert_eq!(manager.status("user"), FeatureStatus::Registered);
        assert_eq!(manager.status("nope"), FeatureStatus::Unknown);
        let meta = manager.metadata("user").unwrap();
        assert_eq!(meta.version.as_deref(), Some("1.2.0"));
        assert_eq!(meta.dependencies, ["auth"]);
        assert!(manager.metadata("nope").is_none());

        manager.ensure_loaded("auth").await.unwrap();
        let stats = manager.stats();
        assert_eq!(stats.loaded, ["auth"]);
        assert!(stats.loading.is_empty());
        assert_eq!(stats.pending(), ["user"]);
        assert!(!manager.is_loaded("user"), "never requested");
        assert!(!manager.is_loaded("nope"));
    }

    #[test]
    fn test_load_cancelled_with_its_runtime_can_be_retried() {
        let tracker = Tracker::new();
        let manager = manager_with([tracked("slow", &[], &tracker, Pace::Delay(Duration::from_millis(200)))]);

        let first = tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build().unwrap();
        let err = first.block_on(manager.ensure_loaded_within("slow", Duration::from_millis(20))).unwrap_err();
        assert!(matches!(err, FeatureError::Timeout { .. }));
        drop(first);
        assert_eq!(manager.status("slow"), FeatureStatus::Loading);

        let second = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let err = second.block_on(manager.ensure_loaded("slow")).unwrap_err();
        assert!(matches!(err, FeatureError::Internal { .. }), "{err}");
        assert_eq!(manager.status("slow"), FeatureStatus::Registered);

        second.block_on(manager.ensure_loaded("slow")).unwrap();
        assert!(manager.is_loaded("slow"));
        assert!(manager.stats().loading.is_empty());
        assert_eq!(tracker.loads(), 2);
    }

    #[tokio::test]
    async fn test_reset_forgets_loaded_features() {
        let tracker = Tracker::new();
        let manager = manager_with([counted("auth", &[], &tracker)]);

        manager.ensure_loaded("auth").await.unwrap();
        manager.reset();

        assert!(!manager.is_loaded("auth"));
        assert!(manager.loaded().is_empty());
        assert_eq!(manager.registered(), ["auth"], "registry is untouched");

        manager.ensure_loaded("auth").await.unwrap();
        assert_eq!(tracker.loads(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reset_discards_in_flight_outcome() {
        let tracker = Tracker::new();
        let gate = Arc::new(Notify::new());
        let manager = manager_with([tracked("slow", &[], &tracker, Pace::Gate(Arc::clone(&gate)))]);

        let pending = tokio::spawn({
            let manager = manager.clone();
            async move { manager.ensure_loaded("slow").await }
        });
        wait_for_status(&manager, "slow", FeatureStatus::Loading).await;

        manager.reset();
        assert_eq!(manager.status("slow"), FeatureStatus::Registered);

        gate.notify_one();
        pending.await.unwrap().unwrap();
        assert!(!manager.is_loaded("slow"), "outcome of a reset episode is dropped");
    }

    #[tokio::test]
    async fn test_lifecycle_events_are_published() {
        let tracker = Tracker::new();
        let manager = manager_with([counted("auth", &[], &tracker), rejecting("vault", Duration::ZERO)]);
        let mut events = manager.subscribe();

        manager.ensure_loaded("auth").await.unwrap();
        manager.ensure_loaded("vault").await.unwrap_err();

        let loading = events.recv().await.unwrap();
        assert!(matches!(loading, FeatureEvent::Loading { ref name } if name == "auth"));
        let loaded = events.recv().await.unwrap();
        assert!(matches!(loaded, FeatureEvent::Loaded { ref name, .. } if name == "auth"));
        assert_eq!(events.recv().await.unwrap().name(), "vault");
        let failed = events.recv().await.unwrap();
        assert!(matches!(failed, FeatureEvent::Failed { error: FeatureError::RegistrationFailed { .. }, .. }));
    }
}
