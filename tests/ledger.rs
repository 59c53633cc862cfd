use ttl::clock::{Clock, ManualClock};
use ttl::config::LedgerConfig;
use ttl::error::{ledger_error, LedgerError};
use ttl::gate::{Directory, MembershipGate};
use ttl::ids::{AccountOwner, TeamId, UserId};
use ttl::models::{OperationKind, OperationStatus, TransactionKind};
use ttl::services::{OperationRequest, TeaAccountService};
use ttl::Grams;

use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};

const TEAM_T: TeamId = TeamId(1);
const SOLO_TEAM: TeamId = TeamId(2);
const OTHER_SOLO_TEAM: TeamId = TeamId(3);
const RESERVED_TEAM: TeamId = TeamId(99);

const USER_A: UserId = UserId(100);
const USER_B: UserId = UserId(101);
const USER_C: UserId = UserId(102);
const SOLO_USER: UserId = UserId(200);
const OTHER_SOLO_USER: UserId = UserId(201);
const OUTSIDER: UserId = UserId(300);

struct Ledger {
    clock: Arc<ManualClock>,
    service: Arc<TeaAccountService>,
}

fn build_ledger() -> Ledger {
    let directory = Directory::new();

    directory.add_core_member(TEAM_T, USER_A);
    directory.add_core_member(TEAM_T, USER_B);
    directory.add_member(TEAM_T, USER_C);
    directory.add_core_member(SOLO_TEAM, SOLO_USER);
    directory.add_core_member(OTHER_SOLO_TEAM, OTHER_SOLO_USER);
    directory.add_user(OUTSIDER);
    directory.reserve(RESERVED_TEAM);

    let gate: Arc<dyn MembershipGate> = Arc::new(directory);
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let time: Arc<dyn Clock> = clock.clone();

    let service = ttl::build_account_service(gate, time, LedgerConfig::default()).unwrap();

    Ledger {
        clock,
        service: Arc::new(service),
    }
}

fn grams(grams: i64) -> Grams {
    Grams::from_grams(grams).unwrap()
}

fn error_of<T: std::fmt::Debug>(result: ttl::Result<T>) -> LedgerError {
    let err = result.unwrap_err();
    ledger_error(&err).cloned().unwrap()
}

fn balance(ledger: &Ledger, team_id: TeamId) -> Grams {
    ledger.service.get_account(team_id).unwrap().balance
}

#[test]
fn two_member_withdrawal_scenario() {
    let ledger = build_ledger();
    ledger.service.grant_tea(TEAM_T, grams(100), "seed").unwrap();

    let first = ledger
        .service
        .submit_operation(OperationRequest::new(
            TEAM_T,
            USER_A,
            OperationKind::Withdraw,
            grams(30),
        ))
        .unwrap();
    assert_eq!(first.status, OperationStatus::Pending);

    let second = ledger
        .service
        .submit_operation(OperationRequest::new(
            TEAM_T,
            USER_A,
            OperationKind::Withdraw,
            grams(80),
        ))
        .unwrap();
    assert_eq!(second.status, OperationStatus::Pending);

    let approved = ledger.service.approve_operation(&first.uuid, USER_B).unwrap();
    assert_eq!(approved.status, OperationStatus::Approved);
    assert_eq!(approved.approver, Some(USER_B));
    assert_eq!(balance(&ledger, TEAM_T), grams(70));

    let withdrawals = ledger
        .service
        .list_transactions(TEAM_T, 1, 10, Some(TransactionKind::Withdraw))
        .unwrap();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0].balance_before, grams(100));
    assert_eq!(withdrawals[0].balance_after, grams(70));

    assert!(matches!(
        error_of(ledger.service.approve_operation(&second.uuid, USER_B)),
        LedgerError::InsufficientBalance { .. }
    ));
    assert_eq!(balance(&ledger, TEAM_T), grams(70));
}

#[test]
fn only_core_members_resolve_operations() {
    let ledger = build_ledger();

    let operation = ledger
        .service
        .submit_operation(OperationRequest::new(
            TEAM_T,
            USER_C,
            OperationKind::Deposit,
            grams(5),
        ))
        .unwrap();

    assert_eq!(
        error_of(ledger.service.approve_operation(&operation.uuid, USER_C)),
        LedgerError::Unauthorized(USER_C, TEAM_T)
    );
    assert_eq!(
        error_of(ledger.service.reject_operation(&operation.uuid, SOLO_USER, "no")),
        LedgerError::Unauthorized(SOLO_USER, TEAM_T)
    );

    let rejected = ledger
        .service
        .reject_operation(&operation.uuid, USER_A, "duplicate")
        .unwrap();
    assert_eq!(rejected.status, OperationStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("duplicate"));

    assert_eq!(
        error_of(ledger.service.approve_operation(&operation.uuid, USER_B)),
        LedgerError::InvalidState(operation.uuid, OperationStatus::Rejected)
    );
}

#[test]
fn pending_operation_expires_lazily() {
    let ledger = build_ledger();

    let operation = ledger
        .service
        .submit_operation(
            OperationRequest::new(TEAM_T, USER_A, OperationKind::Deposit, grams(5))
                .expiring_in_hours(1),
        )
        .unwrap();

    ledger.clock.advance(Duration::hours(2));

    assert_eq!(
        error_of(ledger.service.approve_operation(&operation.uuid, USER_B)),
        LedgerError::Expired(operation.uuid, operation.expires_at)
    );
    assert_eq!(
        ledger.service.get_operation(&operation.uuid).unwrap().status,
        OperationStatus::Expired
    );
    assert!(ledger
        .service
        .list_pending_operations(TEAM_T, 1, 10)
        .unwrap()
        .is_empty());
    assert_eq!(balance(&ledger, TEAM_T), Grams::ZERO);
}

#[test]
fn overdue_operation_cannot_be_rejected() {
    let ledger = build_ledger();

    let operation = ledger
        .service
        .submit_operation(
            OperationRequest::new(TEAM_T, USER_A, OperationKind::Deposit, grams(3))
                .expiring_in_hours(1),
        )
        .unwrap();

    ledger.clock.advance(Duration::hours(2));

    assert_eq!(
        error_of(ledger.service.reject_operation(&operation.uuid, USER_B, "late")),
        LedgerError::Expired(operation.uuid, operation.expires_at)
    );

    let stored = ledger.service.get_operation(&operation.uuid).unwrap();
    assert_eq!(stored.status, OperationStatus::Expired);
    assert_eq!(stored.rejection_reason, None);

    assert_eq!(
        error_of(ledger.service.reject_operation(&operation.uuid, USER_B, "late")),
        LedgerError::InvalidState(operation.uuid, OperationStatus::Expired)
    );
}

#[test]
fn operation_entries_follow_the_transfer() {
    let ledger = build_ledger();
    ledger.service.grant_tea(TEAM_T, grams(20), "seed").unwrap();

    let transfer = ledger
        .service
        .submit_operation(
            OperationRequest::new(TEAM_T, USER_A, OperationKind::TransferOut, grams(8))
                .to_user(OUTSIDER),
        )
        .unwrap();

    assert!(ledger
        .service
        .operation_entries(&transfer.uuid)
        .unwrap()
        .is_empty());
    assert!(ledger
        .service
        .build_report()
        .unwrap()
        .iter()
        .all(|row| row.owner != "user:300"));

    ledger
        .service
        .approve_operation(&transfer.uuid, USER_B)
        .unwrap();

    let entries = ledger.service.operation_entries(&transfer.uuid).unwrap();
    let kinds: Vec<TransactionKind> = entries.iter().map(|tx| tx.kind).collect();

    assert_eq!(
        kinds,
        vec![TransactionKind::TransferOut, TransactionKind::TransferIn]
    );
    assert_eq!(entries[0].owner, AccountOwner::Team(TEAM_T));
    assert_eq!(entries[1].owner, AccountOwner::User(OUTSIDER));
    assert_eq!(entries[1].balance_after, grams(8));
}

#[test]
fn reserved_team_holds_nothing() {
    let ledger = build_ledger();

    let account = ledger.service.get_account(RESERVED_TEAM).unwrap();
    assert!(account.is_frozen());
    assert_eq!(account.balance, Grams::ZERO);

    assert_eq!(
        error_of(ledger.service.submit_operation(OperationRequest::new(
            RESERVED_TEAM,
            USER_A,
            OperationKind::Deposit,
            grams(1),
        ))),
        LedgerError::AccountFrozen(AccountOwner::Team(RESERVED_TEAM))
    );
    assert_eq!(
        error_of(ledger.service.unfreeze_account(RESERVED_TEAM)),
        LedgerError::AccountFrozen(AccountOwner::Team(RESERVED_TEAM))
    );
    assert!(ledger.service.grant_tea(RESERVED_TEAM, grams(1), "").is_err());

    let report = ledger.service.build_report().unwrap();
    assert!(report.iter().all(|row| row.owner != "team:99"));
}

#[test]
fn freeze_and_unfreeze() {
    let ledger = build_ledger();
    ledger.service.grant_tea(SOLO_TEAM, grams(10), "seed").unwrap();

    let frozen = ledger.service.freeze_account(SOLO_TEAM, "audit").unwrap();
    assert_eq!(frozen.frozen_reason(), Some("audit"));

    assert_eq!(
        error_of(ledger.service.submit_operation(OperationRequest::new(
            SOLO_TEAM,
            SOLO_USER,
            OperationKind::Withdraw,
            grams(1),
        ))),
        LedgerError::AccountFrozen(AccountOwner::Team(SOLO_TEAM))
    );
    assert!(ledger.service.grant_tea(SOLO_TEAM, grams(1), "frozen").is_err());
    assert_eq!(balance(&ledger, SOLO_TEAM), grams(10));

    let normal = ledger.service.unfreeze_account(SOLO_TEAM).unwrap();
    assert!(!normal.is_frozen());

    ledger
        .service
        .submit_operation(OperationRequest::new(
            SOLO_TEAM,
            SOLO_USER,
            OperationKind::Withdraw,
            grams(1),
        ))
        .unwrap();
    assert_eq!(balance(&ledger, SOLO_TEAM), grams(9));
}

#[test]
fn transfers_to_teams_and_users() {
    let ledger = build_ledger();
    ledger.service.grant_tea(SOLO_TEAM, grams(50), "seed").unwrap();

    let to_team = ledger
        .service
        .submit_operation(
            OperationRequest::new(SOLO_TEAM, SOLO_USER, OperationKind::TransferOut, grams(20))
                .to_team(TEAM_T),
        )
        .unwrap();
    assert_eq!(to_team.status, OperationStatus::Approved);

    let to_user = ledger
        .service
        .submit_operation(
            OperationRequest::new(SOLO_TEAM, SOLO_USER, OperationKind::TransferOut, grams(5))
                .to_user(OUTSIDER),
        )
        .unwrap();
    assert_eq!(to_user.status, OperationStatus::Approved);

    assert_eq!(balance(&ledger, SOLO_TEAM), grams(25));
    assert_eq!(balance(&ledger, TEAM_T), grams(20));
    assert_eq!(
        ledger.service.get_personal_account(OUTSIDER).unwrap().balance,
        grams(5)
    );

    let incoming = ledger
        .service
        .list_transactions(TEAM_T, 1, 10, None)
        .unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].kind, TransactionKind::TransferIn);
    assert_eq!(incoming[0].operation, Some(to_team.uuid));
    assert_eq!(
        incoming[0].counterparty,
        Some(AccountOwner::Team(SOLO_TEAM))
    );

    assert_eq!(
        error_of(ledger.service.get_personal_account(USER_A)),
        LedgerError::AccountNotFound(AccountOwner::User(USER_A))
    );

    for owner in [
        AccountOwner::Team(SOLO_TEAM),
        AccountOwner::Team(TEAM_T),
        AccountOwner::User(OUTSIDER),
    ] {
        assert!(ledger.service.verify_account(owner).unwrap());
    }
}

#[test]
fn concurrent_withdrawals_never_overdraw() {
    let ledger = build_ledger();
    ledger.service.grant_tea(SOLO_TEAM, grams(100), "seed").unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let service = ledger.service.clone();

            thread::spawn(move || {
                service.submit_operation(OperationRequest::new(
                    SOLO_TEAM,
                    SOLO_USER,
                    OperationKind::Withdraw,
                    Grams::from_grams(20).unwrap(),
                ))
            })
        })
        .collect();

    let mut succeeded = 0;

    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => succeeded += 1,
            Err(err) => assert!(matches!(
                ledger_error(&err),
                Some(LedgerError::InsufficientBalance { .. })
            )),
        }
    }

    assert_eq!(succeeded, 5);
    assert_eq!(balance(&ledger, SOLO_TEAM), Grams::ZERO);
    assert_eq!(
        ledger
            .service
            .replay_balance(AccountOwner::Team(SOLO_TEAM))
            .unwrap(),
        Grams::ZERO
    );
}

#[test]
fn opposite_transfers_do_not_deadlock() {
    let ledger = build_ledger();
    ledger.service.grant_tea(SOLO_TEAM, grams(1000), "seed").unwrap();
    ledger
        .service
        .grant_tea(OTHER_SOLO_TEAM, grams(1000), "seed")
        .unwrap();

    let transfer = |from: TeamId, operator: UserId, to: TeamId| {
        let service = ledger.service.clone();

        thread::spawn(move || {
            for _ in 0..50 {
                service
                    .submit_operation(
                        OperationRequest::new(
                            from,
                            operator,
                            OperationKind::TransferOut,
                            Grams::from_grams(1).unwrap(),
                        )
                        .to_team(to),
                    )
                    .unwrap();
            }
        })
    };

    let forward = transfer(SOLO_TEAM, SOLO_USER, OTHER_SOLO_TEAM);
    let backward = transfer(OTHER_SOLO_TEAM, OTHER_SOLO_USER, SOLO_TEAM);

    forward.join().unwrap();
    backward.join().unwrap();

    assert_eq!(balance(&ledger, SOLO_TEAM), grams(1000));
    assert_eq!(balance(&ledger, OTHER_SOLO_TEAM), grams(1000));

    for team_id in [SOLO_TEAM, OTHER_SOLO_TEAM] {
        let owner = AccountOwner::Team(team_id);

        assert!(ledger.service.verify_account(owner).unwrap());
        assert_eq!(
            ledger.service.list_transactions(team_id, 1, 100, None).unwrap().len(),
            100
        );
        assert_eq!(
            ledger.service.list_transactions(team_id, 2, 100, None).unwrap().len(),
            1
        );
    }
}

#[test]
fn concurrent_approvals_apply_once() {
    let ledger = build_ledger();

    let operation = ledger
        .service
        .submit_operation(OperationRequest::new(
            TEAM_T,
            USER_A,
            OperationKind::Deposit,
            grams(7),
        ))
        .unwrap();

    let handles: Vec<_> = [USER_A, USER_B, USER_A, USER_B]
        .into_iter()
        .map(|approver| {
            let service = ledger.service.clone();
            let uuid = operation.uuid;

            thread::spawn(move || service.approve_operation(&uuid, approver).is_ok())
        })
        .collect();

    let approvals = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|approved| *approved)
        .count();

    assert_eq!(approvals, 1);
    assert_eq!(balance(&ledger, TEAM_T), grams(7));
    assert_eq!(
        ledger.service.list_transactions(TEAM_T, 1, 10, None).unwrap().len(),
        1
    );
}
