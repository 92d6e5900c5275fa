//! Behaviour every employment store must share, run against both backends.

mod common;

use alumni_api::query::{ListParams, ListQuery, EMPLOYMENT_SORT};
use alumni_api::services::{Backend, BackendSettings};
use alumni_api::store::BackendKind;
use alumni_api::{Database, DocumentDb, ErrorKind};
use common::{employment_request, seed, test_app, test_config, BACKENDS};
use shared_types::{LifecycleState, UpdateEmploymentRequest};
use std::sync::Arc;
use std::time::Duration;

fn default_params() -> ListParams {
    ListParams::resolve(&ListQuery::default(), &EMPLOYMENT_SORT)
}

fn missing_id(kind: BackendKind) -> String {
    match kind {
        BackendKind::Relational => "999999".to_string(),
        BackendKind::Document => uuid::Uuid::now_v7().to_string(),
    }
}

#[tokio::test]
async fn test_soft_delete_twice_is_not_found() {
    let app = test_app();
    for kind in BACKENDS {
        let backend = app.backends.get(kind);
        let fx = seed(backend).await;
        let svc = &backend.employment;

        let record = svc
            .create(&fx.owner, &employment_request(&fx.alumni.id, "Acme"))
            .await
            .unwrap();
        assert_eq!(record.lifecycle_state, LifecycleState::Active);
        assert!(record.deleted_at.is_none() && record.deleted_by.is_none());

        svc.soft_delete(&fx.owner, &record.id).await.unwrap();
        let err = svc.soft_delete(&fx.owner, &record.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{kind}");

        let err = svc.get(&fx.owner, &record.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{kind}");
    }
}

#[tokio::test]
async fn test_restore_round_trip() {
    let app = test_app();
    for kind in BACKENDS {
        let backend = app.backends.get(kind);
        let fx = seed(backend).await;
        let svc = &backend.employment;

        let original = svc
            .create(&fx.owner, &employment_request(&fx.alumni.id, "Acme"))
            .await
            .unwrap();

        svc.soft_delete(&fx.owner, &original.id).await.unwrap();
        let trashed = svc.get_trashed(&fx.owner, &original.id).await.unwrap();
        assert_eq!(trashed.lifecycle_state, LifecycleState::SoftDeleted);
        assert_eq!(trashed.deleted_by.as_deref(), Some(fx.owner.user_id.as_str()));
        assert!(trashed.deleted_at.is_some());

        svc.restore(&fx.owner, &original.id).await.unwrap();
        let restored = svc.get(&fx.owner, &original.id).await.unwrap();
        assert_eq!(restored, original, "{kind}");

        let err = svc.restore(&fx.owner, &original.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn test_purge_only_from_trash_and_is_terminal() {
    let app = test_app();
    for kind in BACKENDS {
        let backend = app.backends.get(kind);
        let fx = seed(backend).await;
        let svc = &backend.employment;

        let record = svc
            .create(&fx.owner, &employment_request(&fx.alumni.id, "Acme"))
            .await
            .unwrap();

        let err = svc.purge(&fx.admin, &record.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{kind}");
        assert!(svc.get(&fx.owner, &record.id).await.is_ok());

        svc.soft_delete(&fx.owner, &record.id).await.unwrap();
        svc.purge(&fx.admin, &record.id).await.unwrap();

        for result in [
            svc.get(&fx.admin, &record.id).await,
            svc.get_trashed(&fx.admin, &record.id).await,
        ] {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
        }
        assert_eq!(
            svc.restore(&fx.admin, &record.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            svc.purge(&fx.admin, &record.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}

#[tokio::test]
async fn test_ownership_is_enforced_after_state() {
    let app = test_app();
    for kind in BACKENDS {
        let backend = app.backends.get(kind);
        let fx = seed(backend).await;
        let svc = &backend.employment;

        let record = svc
            .create(&fx.owner, &employment_request(&fx.alumni.id, "Acme"))
            .await
            .unwrap();

        let forbidden = [
            svc.get(&fx.other, &record.id).await.map(|_| ()),
            svc.soft_delete(&fx.other, &record.id).await,
            svc.update(
                &fx.other,
                &record.id,
                &UpdateEmploymentRequest {
                    job_title: Some("CTO".to_string()),
                    ..Default::default()
                },
            )
            .await
            .map(|_| ()),
        ];
        for result in forbidden {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::Forbidden, "{kind}");
        }

        // wrong state wins over wrong owner
        let err = svc.restore(&fx.other, &record.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        svc.soft_delete(&fx.owner, &record.id).await.unwrap();
        let err = svc.get_trashed(&fx.other, &record.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let err = svc.purge(&fx.other, &record.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        // the failed attempts left the record where it was
        let trashed = svc.get_trashed(&fx.admin, &record.id).await.unwrap();
        assert_eq!(trashed.lifecycle_state, LifecycleState::SoftDeleted);
    }
}

#[tokio::test]
async fn test_concurrent_soft_delete_has_one_winner() {
    let app = test_app();
    for kind in BACKENDS {
        let backend = app.backends.get(kind);
        let fx = seed(backend).await;
        let svc = &backend.employment;

        let record = svc
            .create(&fx.owner, &employment_request(&fx.alumni.id, "Acme"))
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            svc.soft_delete(&fx.owner, &record.id),
            svc.soft_delete(&fx.admin, &record.id)
        );

        let outcomes = [first, second];
        let winners = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "{kind}");
        let loser = outcomes.into_iter().find_map(Result::err).unwrap();
        assert_eq!(loser.kind(), ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn test_list_counts_follow_filters() {
    let app = test_app();
    for kind in BACKENDS {
        let backend = app.backends.get(kind);
        let fx = seed(backend).await;
        let svc = &backend.employment;

        let other_alumni = backend
            .alumni
            .create(
                &fx.admin,
                &common::alumni_request(&fx.other.user_id, "2018002"),
            )
            .await
            .unwrap();

        let mut own = Vec::new();
        for company in ["Acme", "Globex", "Initech"] {
            let record = svc
                .create(&fx.owner, &employment_request(&fx.alumni.id, company))
                .await
                .unwrap();
            own.push(record);
        }
        svc.create(&fx.other, &employment_request(&other_alumni.id, "Umbrella"))
            .await
            .unwrap();
        svc.soft_delete(&fx.owner, &own[0].id).await.unwrap();

        let params = default_params();
        let page = svc.list(&fx.owner, &params).await.unwrap();
        assert_eq!(page.total, 2, "{kind}");
        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().all(|r| r.alumni_id == fx.alumni.id));

        assert_eq!(svc.list(&fx.admin, &params).await.unwrap().total, 3);
        assert_eq!(svc.list_trash(&fx.admin, &params).await.unwrap().total, 1);
        assert_eq!(svc.list_trash(&fx.other, &params).await.unwrap().total, 0);

        let paged = ListParams::resolve(
            &ListQuery {
                limit: Some("1".to_string()),
                page: Some("2".to_string()),
                sort_by: Some("company_name".to_string()),
                order: Some("desc".to_string()),
                ..Default::default()
            },
            &EMPLOYMENT_SORT,
        );
        let page = svc.list(&fx.admin, &paged).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].company_name, "Initech");
        assert_eq!(page.into_response(&paged).meta.unwrap().pages, 3);

        let searched = ListParams::resolve(
            &ListQuery {
                search: Some("glob".to_string()),
                ..Default::default()
            },
            &EMPLOYMENT_SORT,
        );
        let page = svc.list(&fx.admin, &searched).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].company_name, "Globex");
    }
}

#[tokio::test]
async fn test_create_and_update_validation() {
    let app = test_app();
    for kind in BACKENDS {
        let backend = app.backends.get(kind);
        let fx = seed(backend).await;
        let svc = &backend.employment;

        let err = svc
            .create(&fx.admin, &employment_request(&missing_id(kind), "Acme"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{kind}");

        let err = svc.get(&fx.admin, "not-an-id").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = svc
            .create(&fx.other, &employment_request(&fx.alumni.id, "Acme"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let record = svc
            .create(&fx.owner, &employment_request(&fx.alumni.id, "Acme"))
            .await
            .unwrap();
        let updated = svc
            .update(
                &fx.owner,
                &record.id,
                &UpdateEmploymentRequest {
                    job_title: Some("Staff Engineer".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.job_title, "Staff Engineer");
        assert_eq!(updated.company_name, "Acme");
        assert!(updated.updated_at.is_some());

        let backwards = UpdateEmploymentRequest {
            end_date: chrono::NaiveDate::from_ymd_opt(2020, 1, 1),
            ..Default::default()
        };
        let err = svc.update(&fx.owner, &record.id, &backwards).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        svc.soft_delete(&fx.owner, &record.id).await.unwrap();
        let err = svc
            .update(&fx.admin, &record.id, &UpdateEmploymentRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn test_graduation_year_report() {
    let app = test_app();
    for kind in BACKENDS {
        let backend = app.backends.get(kind);
        let fx = seed(backend).await;
        let svc = &backend.employment;

        let mut low = employment_request(&fx.alumni.id, "Smallco");
        low.salary_range = "3000000-4000000".to_string();
        svc.create(&fx.owner, &low).await.unwrap();
        svc.create(&fx.owner, &employment_request(&fx.alumni.id, "Acme"))
            .await
            .unwrap();
        let trashed = svc
            .create(&fx.owner, &employment_request(&fx.alumni.id, "Gone"))
            .await
            .unwrap();
        svc.soft_delete(&fx.owner, &trashed.id).await.unwrap();

        let report = backend
            .alumni
            .graduation_year_report(&fx.admin, 2022, None)
            .await
            .unwrap();
        assert_eq!(report.entries.len(), 2, "{kind}");
        assert_eq!(report.above_threshold, 1);

        let report = backend
            .alumni
            .graduation_year_report(&fx.admin, 2022, Some(3_000_000))
            .await
            .unwrap();
        assert_eq!(report.above_threshold, 2);

        let err = backend
            .alumni
            .graduation_year_report(&fx.owner, 2022, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}

#[tokio::test]
async fn test_search_folds_non_ascii_case() {
    let app = test_app();
    for kind in BACKENDS {
        let backend = app.backends.get(kind);
        let fx = seed(backend).await;
        let svc = &backend.employment;

        for company in ["ÉCOLE Über", "Ecole Polytechnique"] {
            svc.create(&fx.owner, &employment_request(&fx.alumni.id, company))
                .await
                .unwrap();
        }

        for term in ["école", "ÜBER"] {
            let params = ListParams::resolve(
                &ListQuery {
                    search: Some(term.to_string()),
                    ..Default::default()
                },
                &EMPLOYMENT_SORT,
            );
            let page = svc.list(&fx.admin, &params).await.unwrap();
            assert_eq!(page.total, 1, "{kind} {term}");
            assert_eq!(page.items[0].company_name, "ÉCOLE Über");
        }
    }
}

#[tokio::test]
async fn test_overrunning_write_times_out_and_rolls_back() {
    let app = test_app();
    let config = test_config(&app.dir);
    let settings = BackendSettings::from_config(&config);

    // relational: another connection holds the write lock past the budget
    let backend = app.backends.get(BackendKind::Relational);
    let fx = seed(backend).await;
    let record = backend
        .employment
        .create(&fx.owner, &employment_request(&fx.alumni.id, "Acme"))
        .await
        .unwrap();

    let db_path = config.storage.database_path();
    let slow = Database::new(&db_path, Duration::from_millis(500)).unwrap();
    let slow = Backend::new(BackendKind::Relational, slow.stores(), &settings);

    let blocker = rusqlite::Connection::open(&db_path).unwrap();
    blocker.execute_batch("BEGIN IMMEDIATE").unwrap();
    let err = slow
        .employment
        .soft_delete(&fx.owner, &record.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    blocker.execute_batch("ROLLBACK").unwrap();

    // let the abandoned transaction wake up and fail its own deadline check
    tokio::time::sleep(Duration::from_millis(200)).await;
    let current = backend.employment.get(&fx.owner, &record.id).await.unwrap();
    assert_eq!(current.lifecycle_state, LifecycleState::Active);

    // document: a zero budget is spent before the staged write can land
    let backend = app.backends.get(BackendKind::Document);
    let fx = seed(backend).await;
    let record = backend
        .employment
        .create(&fx.owner, &employment_request(&fx.alumni.id, "Acme"))
        .await
        .unwrap();

    let doc_path = config.storage.document_path();
    let slow = Arc::new(DocumentDb::open(&doc_path, Duration::ZERO).unwrap());
    let slow = Backend::new(BackendKind::Document, slow.stores(), &settings);
    let err = slow
        .employment
        .soft_delete(&fx.owner, &record.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    let reopened = Arc::new(DocumentDb::open(&doc_path, Duration::from_secs(10)).unwrap());
    let reopened = Backend::new(BackendKind::Document, reopened.stores(), &settings);
    let current = reopened.employment.get(&fx.owner, &record.id).await.unwrap();
    assert_eq!(current.lifecycle_state, LifecycleState::Active);
    assert!(current.deleted_at.is_none());
}
