//! End-to-end integration tests
//!
//! These tests drive the Service Facade the way the request dispatcher does,
//! one `CallContext` per call, and check the lifecycle and consistency
//! properties of the service:
//! - Registration uniqueness, including under concurrent registrations
//! - Login identity and credential rejection
//! - Loan request, status, payment and their illegal transitions
//! - Exactly one winner among concurrent loan requests for one account
//!
//! Each test is run twice: once on the in-memory store and once on a SQLite
//! database in a temporary directory.

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use futures::future::join_all;
    use loan_service::core::due_date_from;
    use loan_service::service::{
        Client, LoanInfo, LoanRequest, UserCredentials, UserRegisterCredentials,
    };
    use loan_service::store::{MemoryStore, RetryPolicy, SqliteStore};
    use loan_service::{CallContext, LoanService, LoanServiceError, Store};
    use rstest::rstest;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Copy)]
    enum Backend {
        Memory,
        Sqlite,
    }

    /// Service plus whatever keeps its storage alive
    struct Harness {
        service: LoanService,
        store: Arc<dyn Store>,
        _dir: Option<TempDir>,
    }

    fn harness(backend: Backend) -> Harness {
        match backend {
            Backend::Memory => {
                let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
                Harness {
                    service: LoanService::new(Arc::clone(&store)),
                    store,
                    _dir: None,
                }
            }
            Backend::Sqlite => {
                let dir = TempDir::new().expect("Failed to create temp dir");
                // Generous retry budget: concurrent tests contend for one file
                let retry = RetryPolicy::new(
                    10,
                    std::time::Duration::from_millis(5),
                    std::time::Duration::from_millis(50),
                );
                let store: Arc<dyn Store> = Arc::new(
                    SqliteStore::open(dir.path().join("loans.db"), retry)
                        .expect("Failed to open sqlite store"),
                );
                Harness {
                    service: LoanService::new(Arc::clone(&store)),
                    store,
                    _dir: Some(dir),
                }
            }
        }
    }

    fn register(name: &str, password: &str) -> UserRegisterCredentials {
        UserRegisterCredentials {
            name: name.to_string(),
            password: password.to_string(),
        }
    }

    fn login(name: &str, password: &str) -> UserCredentials {
        UserCredentials {
            name: name.to_string(),
            password: password.to_string(),
        }
    }

    fn client(id: i32) -> Client {
        Client {
            id,
            ..Client::default()
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_register_then_login_same_id(
        #[values(Backend::Memory, Backend::Sqlite)] backend: Backend,
    ) {
        let h = harness(backend);
        let ctx = CallContext::background();

        let registered = h
            .service
            .register_client(&ctx, register("bob", "p1"))
            .await
            .unwrap();
        let logged_in = h.service.login_client(&ctx, login("bob", "p1")).await.unwrap();
        let wrong = h.service.login_client(&ctx, login("bob", "wrong")).await;

        assert_eq!(logged_in.id, registered.id);
        assert_eq!(logged_in.name, "bob");
        assert_eq!(wrong, Err(LoanServiceError::InvalidCredentials));
    }

    #[rstest]
    #[tokio::test]
    async fn test_second_registration_always_fails(
        #[values(Backend::Memory, Backend::Sqlite)] backend: Backend,
    ) {
        let h = harness(backend);
        let ctx = CallContext::background();
        h.service
            .register_client(&ctx, register("bob", "p1"))
            .await
            .unwrap();
        h.service
            .register_client(&ctx, register("alice", "p1"))
            .await
            .unwrap();

        let second = h.service.register_client(&ctx, register("bob", "p2")).await;

        assert_eq!(second, Err(LoanServiceError::already_exists("bob")));
        // The original secret is untouched
        assert!(h.service.login_client(&ctx, login("bob", "p1")).await.is_ok());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_single_winner(
        #[values(Backend::Memory, Backend::Sqlite)] backend: Backend,
    ) {
        let h = harness(backend);

        let attempts = (0..10).map(|i| {
            let service = h.service.clone();
            tokio::spawn(async move {
                service
                    .register_client(&CallContext::background(), register("carol", &format!("p{i}")))
                    .await
            })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.expect("task panicked"))
            .collect();

        let winners = results.iter().filter(|r| r.is_ok()).count();
        let losers = results
            .iter()
            .filter(|r| matches!(r, Err(LoanServiceError::AlreadyExists { .. })))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(losers, 9);
    }

    #[rstest]
    #[tokio::test]
    async fn test_request_then_status_is_due_in_a_year(
        #[values(Backend::Memory, Backend::Sqlite)] backend: Backend,
    ) {
        let h = harness(backend);
        let ctx = CallContext::background();
        let account = h
            .service
            .register_client(&ctx, register("dave", "pw"))
            .await
            .unwrap();
        let requested_at = Utc::now();

        let opened = h
            .service
            .request_amount(
                &ctx,
                LoanRequest {
                    client_id: account.id,
                    amount: 2_500,
                },
            )
            .await
            .unwrap();
        let status = h
            .service
            .check_client_status(&ctx, client(account.id))
            .await
            .unwrap();

        assert_eq!(status, opened);
        assert_eq!(status.amount, 2_500);
        let expected = due_date_from(requested_at).timestamp();
        assert!(
            (status.pay_day - expected).abs() <= 5,
            "payDay {} not within 5s of {}",
            status.pay_day,
            expected
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_pay_once_then_no_active_loan(
        #[values(Backend::Memory, Backend::Sqlite)] backend: Backend,
    ) {
        let h = harness(backend);
        let ctx = CallContext::background();
        h.service
            .request_amount(
                &ctx,
                LoanRequest {
                    client_id: 4,
                    amount: 100,
                },
            )
            .await
            .unwrap();

        let first = h.service.pay_loan(&ctx, client(4)).await;
        let second = h.service.pay_loan(&ctx, client(4)).await;
        let status = h.service.check_client_status(&ctx, client(4)).await.unwrap();

        assert_eq!(first.unwrap().msg, "Loan payed");
        assert_eq!(second, Err(LoanServiceError::no_active_loan(4)));
        assert_eq!(status, LoanInfo::default());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_loan_requests_single_winner(
        #[values(Backend::Memory, Backend::Sqlite)] backend: Backend,
        #[values(2, 16)] concurrency: usize,
    ) {
        let h = harness(backend);

        let attempts = (0..concurrency).map(|_| {
            let service = h.service.clone();
            tokio::spawn(async move {
                service
                    .request_amount(
                        &CallContext::background(),
                        LoanRequest {
                            client_id: 7,
                            amount: 100,
                        },
                    )
                    .await
            })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.expect("task panicked"))
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let rejections = results
            .iter()
            .filter(|r| **r == Err(LoanServiceError::already_has_loan(7)))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(rejections, concurrency - 1);

        let stored = h.store.find_loan_by_account_id(7).await.unwrap();
        assert_eq!(stored.amount, 100);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_request_racing_pay_ends_consistent(
        #[values(Backend::Memory, Backend::Sqlite)] backend: Backend,
    ) {
        let h = harness(backend);
        let ctx = CallContext::background();
        h.service
            .request_amount(
                &ctx,
                LoanRequest {
                    client_id: 3,
                    amount: 50,
                },
            )
            .await
            .unwrap();

        let pay = {
            let service = h.service.clone();
            tokio::spawn(async move { service.pay_loan(&CallContext::background(), client(3)).await })
        };
        let request = {
            let service = h.service.clone();
            tokio::spawn(async move {
                service
                    .request_amount(
                        &CallContext::background(),
                        LoanRequest {
                            client_id: 3,
                            amount: 75,
                        },
                    )
                    .await
            })
        };
        let paid = pay.await.unwrap();
        let requested = request.await.unwrap();

        assert!(paid.is_ok());
        let status = h.service.check_client_status(&ctx, client(3)).await.unwrap();
        match requested {
            // Request ran after the payment: the new loan is the one stored
            Ok(loan) => assert_eq!(status, loan),
            // Request ran before the payment: nothing is left
            Err(err) => {
                assert_eq!(err, LoanServiceError::already_has_loan(3));
                assert_eq!(status, LoanInfo::default());
            }
        }
    }
}
