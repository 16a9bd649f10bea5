//! Lending Service - loan and reservation state transitions
//!
//! Every mutating operation runs its checks and writes inside one database
//! transaction. The partial unique indexes created in `db.rs` back the
//! "one active loan" and "one pending reservation" rules, so a writer that
//! loses a race gets a unique violation, reported as a conflict.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sea_orm::*;

use crate::domain::{Capability, DomainError, authorize};
use crate::models::document::{self, DocumentSummary, Entity as Document};
use crate::models::loan::{self, Entity as Loan, LoanStatus, LoanView};
use crate::models::reservation::{
    self, Entity as Reservation, ReservationStatus, ReservationView,
};
use crate::models::user::{self, Entity as User, Role, UserSummary};

const ALREADY_ON_LOAN: &str = "Document is already on loan";
const ALREADY_RESERVED: &str = "Document is already reserved by another member";

/// Loan and hold durations
#[derive(Debug, Clone, Copy)]
pub struct LendingPolicy {
    pub loan_period_days: i64,
    pub reservation_hold_days: i64,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            loan_period_days: 30,
            reservation_hold_days: 14,
        }
    }
}

impl LendingPolicy {
    pub fn due_date(&self, loan_date: DateTime<Utc>) -> DateTime<Utc> {
        loan_date + Duration::days(self.loan_period_days)
    }

    pub fn hold_until(&self, reservation_date: DateTime<Utc>) -> DateTime<Utc> {
        reservation_date + Duration::days(self.reservation_hold_days)
    }
}

/// The authenticated caller of a lending operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
}

/// Result of converting a reservation into a loan
#[derive(Debug, Clone, serde::Serialize)]
pub struct Fulfillment {
    pub loan: LoanView,
    pub reservation: ReservationView,
}

/// Filter parameters for listing loans
#[derive(Debug, Default, Clone)]
pub struct LoanFilter {
    pub status: Option<LoanStatus>,
    pub member_id: Option<i32>,
    pub document_id: Option<i32>,
}

/// Filter parameters for listing reservations
#[derive(Debug, Default, Clone)]
pub struct ReservationFilter {
    pub status: Option<ReservationStatus>,
    pub member_id: Option<i32>,
    pub document_id: Option<i32>,
}

/// Decide which member a loan or reservation is for.
///
/// Members act for themselves only. Staff must always name a member, which
/// rules out self-checkout.
pub fn target_member_id(actor: Actor, requested: Option<i32>) -> Result<i32, DomainError> {
    if actor.role.is_staff() {
        return requested.ok_or_else(|| {
            DomainError::Validation("member_id is required when staff act for a member".into())
        });
    }

    match requested {
        Some(id) if id != actor.user_id => Err(DomainError::Forbidden(
            "members may only borrow or reserve for themselves".into(),
        )),
        _ => Ok(actor.user_id),
    }
}

fn is_past(timestamp: &str, now: DateTime<Utc>) -> bool {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Utc) < now)
        .unwrap_or(false)
}

fn loan_view(
    loan: loan::Model,
    document: Option<&document::Model>,
    member: Option<&user::Model>,
    now: DateTime<Utc>,
) -> LoanView {
    let is_overdue = loan.status == LoanStatus::Active && is_past(&loan.expected_return_date, now);
    LoanView {
        id: loan.id,
        document_id: loan.document_id,
        member_id: loan.member_id,
        loan_date: loan.loan_date,
        expected_return_date: loan.expected_return_date,
        actual_return_date: loan.actual_return_date,
        status: loan.status,
        is_overdue,
        document: document.map(DocumentSummary::from),
        member: member.map(UserSummary::from),
    }
}

fn reservation_view(
    reservation: reservation::Model,
    document: Option<&document::Model>,
    member: Option<&user::Model>,
    now: DateTime<Utc>,
) -> ReservationView {
    let is_expired =
        reservation.status == ReservationStatus::Pending && is_past(&reservation.expiry_date, now);
    ReservationView {
        id: reservation.id,
        document_id: reservation.document_id,
        member_id: reservation.member_id,
        reservation_date: reservation.reservation_date,
        expiry_date: reservation.expiry_date,
        status: reservation.status,
        is_expired,
        document: document.map(DocumentSummary::from),
        member: member.map(UserSummary::from),
    }
}

async fn find_active_loan<C: ConnectionTrait>(
    db: &C,
    document_id: i32,
) -> Result<Option<loan::Model>, DbErr> {
    Loan::find()
        .filter(loan::Column::DocumentId.eq(document_id))
        .filter(loan::Column::Status.eq(LoanStatus::Active))
        .one(db)
        .await
}

async fn find_pending_reservation<C: ConnectionTrait>(
    db: &C,
    document_id: i32,
) -> Result<Option<reservation::Model>, DbErr> {
    Reservation::find()
        .filter(reservation::Column::DocumentId.eq(document_id))
        .filter(reservation::Column::Status.eq(ReservationStatus::Pending))
        .one(db)
        .await
}

async fn find_document<C: ConnectionTrait>(
    db: &C,
    document_id: i32,
) -> Result<document::Model, DomainError> {
    Document::find_by_id(document_id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Document"))
}

/// Load the borrowing member; staff accounts cannot borrow.
async fn find_member<C: ConnectionTrait>(
    db: &C,
    member_id: i32,
) -> Result<user::Model, DomainError> {
    let member = User::find_by_id(member_id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Member"))?;

    if member.role != Role::Member {
        return Err(DomainError::Validation(format!(
            "user {} is {} and cannot borrow",
            member.id,
            member.role.as_str()
        )));
    }
    Ok(member)
}

async fn insert_loan<C: ConnectionTrait>(
    db: &C,
    policy: &LendingPolicy,
    document_id: i32,
    member_id: i32,
    now: DateTime<Utc>,
) -> Result<loan::Model, DomainError> {
    let stamp = now.to_rfc3339();
    let new_loan = loan::ActiveModel {
        document_id: Set(document_id),
        member_id: Set(member_id),
        loan_date: Set(stamp.clone()),
        expected_return_date: Set(policy.due_date(now).to_rfc3339()),
        actual_return_date: Set(None),
        status: Set(LoanStatus::Active),
        created_at: Set(stamp.clone()),
        updated_at: Set(stamp),
        ..Default::default()
    };

    new_loan
        .insert(db)
        .await
        .map_err(|e| DomainError::from_write(e, ALREADY_ON_LOAN))
}

/// Set the status of matching pending reservations; returns rows changed.
async fn close_pending<C: ConnectionTrait>(
    db: &C,
    condition: Condition,
    status: ReservationStatus,
    now: &str,
) -> Result<u64, DbErr> {
    let result = Reservation::update_many()
        .set(reservation::ActiveModel {
            status: Set(status),
            updated_at: Set(now.to_owned()),
            ..Default::default()
        })
        .filter(condition)
        .filter(reservation::Column::Status.eq(ReservationStatus::Pending))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Coordinates loans and reservations against document availability
#[derive(Clone)]
pub struct LendingService {
    db: DatabaseConnection,
    policy: LendingPolicy,
}

impl LendingService {
    pub fn new(db: DatabaseConnection, policy: LendingPolicy) -> Self {
        Self { db, policy }
    }

    /// Lend a document. A pending reservation the same member holds on it
    /// is fulfilled in the same transaction.
    pub async fn create_loan(
        &self,
        actor: Actor,
        document_id: i32,
        member_id: Option<i32>,
    ) -> Result<LoanView, DomainError> {
        authorize(actor.role, Capability::Borrow)?;
        let member_id = target_member_id(actor, member_id)?;

        let txn = self.db.begin().await?;

        if find_active_loan(&txn, document_id).await?.is_some() {
            return Err(DomainError::Conflict(ALREADY_ON_LOAN.into()));
        }
        let document = find_document(&txn, document_id).await?;
        let member = find_member(&txn, member_id).await?;

        let now = Utc::now();
        let loan = insert_loan(&txn, &self.policy, document.id, member.id, now).await?;

        let fulfilled = close_pending(
            &txn,
            Condition::all()
                .add(reservation::Column::DocumentId.eq(document.id))
                .add(reservation::Column::MemberId.eq(member.id)),
            ReservationStatus::Fulfilled,
            &now.to_rfc3339(),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(
            loan_id = loan.id,
            document_id = document.id,
            member_id = member.id,
            fulfilled_reservations = fulfilled,
            "Loan created"
        );

        Ok(loan_view(loan, Some(&document), Some(&member), now))
    }

    /// Claim the single waitlist slot of a document that is on loan.
    pub async fn create_reservation(
        &self,
        actor: Actor,
        document_id: i32,
        member_id: Option<i32>,
    ) -> Result<ReservationView, DomainError> {
        authorize(actor.role, Capability::Borrow)?;
        let member_id = target_member_id(actor, member_id)?;

        let txn = self.db.begin().await?;

        let document = find_document(&txn, document_id).await?;

        let active_loan = find_active_loan(&txn, document.id).await?.ok_or_else(|| {
            DomainError::InvalidState(
                "Document is available; loan it directly instead of reserving".into(),
            )
        })?;

        let member = find_member(&txn, member_id).await?;

        if active_loan.member_id == member.id {
            return Err(DomainError::Conflict(
                "Member already holds the active loan for this document".into(),
            ));
        }

        if let Some(pending) = find_pending_reservation(&txn, document.id).await? {
            let message = if pending.member_id == member.id {
                "Member already has a pending reservation for this document"
            } else {
                ALREADY_RESERVED
            };
            return Err(DomainError::Conflict(message.into()));
        }

        let now = Utc::now();
        let stamp = now.to_rfc3339();
        let new_reservation = reservation::ActiveModel {
            document_id: Set(document.id),
            member_id: Set(member.id),
            reservation_date: Set(stamp.clone()),
            expiry_date: Set(self.policy.hold_until(now).to_rfc3339()),
            status: Set(ReservationStatus::Pending),
            created_at: Set(stamp.clone()),
            updated_at: Set(stamp),
            ..Default::default()
        };

        let saved = new_reservation
            .insert(&txn)
            .await
            .map_err(|e| DomainError::from_write(e, ALREADY_RESERVED))?;

        txn.commit().await?;

        tracing::info!(
            reservation_id = saved.id,
            document_id = document.id,
            member_id = member.id,
            "Reservation created"
        );

        Ok(reservation_view(saved, Some(&document), Some(&member), now))
    }

    /// Turn a pending reservation into an active loan for its member.
    /// The loan insert and the status flip commit together or not at all.
    pub async fn fulfill_reservation(
        &self,
        actor: Actor,
        reservation_id: i32,
    ) -> Result<Fulfillment, DomainError> {
        authorize(actor.role, Capability::ManageLending)?;

        let txn = self.db.begin().await?;

        let pending = Reservation::find_by_id(reservation_id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation"))?;

        if pending.status != ReservationStatus::Pending {
            return Err(DomainError::InvalidState(
                "Only pending reservations can be fulfilled".into(),
            ));
        }

        if find_active_loan(&txn, pending.document_id).await?.is_some() {
            return Err(DomainError::Conflict("Document is on loan".into()));
        }

        let document = find_document(&txn, pending.document_id).await?;
        // The holder may have been promoted to staff since reserving
        let member = find_member(&txn, pending.member_id).await?;

        let now = Utc::now();
        let loan = insert_loan(&txn, &self.policy, document.id, member.id, now).await?;

        let changed = close_pending(
            &txn,
            Condition::all().add(reservation::Column::Id.eq(pending.id)),
            ReservationStatus::Fulfilled,
            &now.to_rfc3339(),
        )
        .await?;
        if changed != 1 {
            return Err(DomainError::InvalidState(
                "Only pending reservations can be fulfilled".into(),
            ));
        }

        let fulfilled = Reservation::find_by_id(pending.id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation"))?;

        txn.commit().await?;

        tracing::info!(
            reservation_id = fulfilled.id,
            loan_id = loan.id,
            document_id = document.id,
            member_id = member.id,
            "Reservation fulfilled"
        );

        Ok(Fulfillment {
            loan: loan_view(loan, Some(&document), Some(&member), now),
            reservation: reservation_view(fulfilled, Some(&document), Some(&member), now),
        })
    }

    /// Close an active loan. A second call on the same loan is rejected.
    pub async fn return_loan(&self, actor: Actor, loan_id: i32) -> Result<LoanView, DomainError> {
        authorize(actor.role, Capability::ManageLending)?;

        let txn = self.db.begin().await?;

        let existing = Loan::find_by_id(loan_id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Loan"))?;

        if existing.status == LoanStatus::Returned {
            return Err(DomainError::InvalidState("Loan is already returned".into()));
        }

        let now = Utc::now();
        let stamp = now.to_rfc3339();

        // Guarded on status so a concurrent return cannot apply twice
        let result = Loan::update_many()
            .set(loan::ActiveModel {
                actual_return_date: Set(Some(stamp.clone())),
                status: Set(LoanStatus::Returned),
                updated_at: Set(stamp),
                ..Default::default()
            })
            .filter(loan::Column::Id.eq(existing.id))
            .filter(loan::Column::Status.eq(LoanStatus::Active))
            .exec(&txn)
            .await?;

        if result.rows_affected != 1 {
            return Err(DomainError::InvalidState("Loan is already returned".into()));
        }

        let returned = Loan::find_by_id(existing.id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Loan"))?;
        let document = Document::find_by_id(returned.document_id).one(&txn).await?;
        let member = User::find_by_id(returned.member_id).one(&txn).await?;

        txn.commit().await?;

        tracing::info!(
            loan_id = returned.id,
            document_id = returned.document_id,
            member_id = returned.member_id,
            "Loan returned"
        );

        Ok(loan_view(returned, document.as_ref(), member.as_ref(), now))
    }

    /// Staff override of a reservation status.
    ///
    /// Only pending reservations change; they can be cancelled here, while
    /// `fulfilled` has to go through [`Self::fulfill_reservation`] so that a
    /// loan always backs it. Setting the current status again is a no-op.
    pub async fn update_reservation_status(
        &self,
        actor: Actor,
        reservation_id: i32,
        status: ReservationStatus,
    ) -> Result<ReservationView, DomainError> {
        authorize(actor.role, Capability::ManageLending)?;

        let txn = self.db.begin().await?;

        let existing = Reservation::find_by_id(reservation_id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation"))?;

        let now = Utc::now();

        let updated = if existing.status == status {
            existing
        } else if existing.status.is_terminal() {
            return Err(DomainError::InvalidState(format!(
                "Reservation is already {}",
                existing.status.as_str()
            )));
        } else if status == ReservationStatus::Fulfilled {
            return Err(DomainError::InvalidState(
                "Use fulfillment to turn a reservation into a loan".into(),
            ));
        } else {
            let changed = close_pending(
                &txn,
                Condition::all().add(reservation::Column::Id.eq(existing.id)),
                status,
                &now.to_rfc3339(),
            )
            .await?;
            if changed != 1 {
                return Err(DomainError::InvalidState(
                    "Reservation is no longer pending".into(),
                ));
            }
            Reservation::find_by_id(existing.id)
                .one(&txn)
                .await?
                .ok_or_else(|| DomainError::not_found("Reservation"))?
        };

        let document = Document::find_by_id(updated.document_id).one(&txn).await?;
        let member = User::find_by_id(updated.member_id).one(&txn).await?;

        txn.commit().await?;

        tracing::info!(
            reservation_id = updated.id,
            status = updated.status.as_str(),
            "Reservation status updated"
        );

        Ok(reservation_view(updated, document.as_ref(), member.as_ref(), now))
    }

    /// List loans with document and member summaries. Members only see
    /// their own loans.
    pub async fn list_loans(
        &self,
        actor: Actor,
        filter: LoanFilter,
    ) -> Result<Vec<LoanView>, DomainError> {
        let mut condition = Condition::all();

        let member_id = if actor.role.is_staff() {
            filter.member_id
        } else {
            Some(actor.user_id)
        };

        if let Some(member_id) = member_id {
            condition = condition.add(loan::Column::MemberId.eq(member_id));
        }
        if let Some(document_id) = filter.document_id {
            condition = condition.add(loan::Column::DocumentId.eq(document_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(loan::Column::Status.eq(status));
        }

        let loans = Loan::find()
            .filter(condition)
            .order_by_desc(loan::Column::LoanDate)
            .order_by_desc(loan::Column::Id)
            .all(&self.db)
            .await?;

        let (documents, members) = self
            .related(loans.iter().map(|l| (l.document_id, l.member_id)))
            .await?;

        let now = Utc::now();
        Ok(loans
            .into_iter()
            .map(|l| {
                let document = documents.get(&l.document_id);
                let member = members.get(&l.member_id);
                loan_view(l, document, member, now)
            })
            .collect())
    }

    pub async fn get_loan(&self, actor: Actor, loan_id: i32) -> Result<LoanView, DomainError> {
        let loan = Loan::find_by_id(loan_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Loan"))?;

        if !actor.role.is_staff() && loan.member_id != actor.user_id {
            return Err(DomainError::Forbidden(
                "members may only view their own loans".into(),
            ));
        }

        let document = Document::find_by_id(loan.document_id).one(&self.db).await?;
        let member = User::find_by_id(loan.member_id).one(&self.db).await?;
        Ok(loan_view(loan, document.as_ref(), member.as_ref(), Utc::now()))
    }

    /// List reservations. Members only see their own.
    pub async fn list_reservations(
        &self,
        actor: Actor,
        filter: ReservationFilter,
    ) -> Result<Vec<ReservationView>, DomainError> {
        let mut condition = Condition::all();

        let member_id = if actor.role.is_staff() {
            filter.member_id
        } else {
            Some(actor.user_id)
        };

        if let Some(member_id) = member_id {
            condition = condition.add(reservation::Column::MemberId.eq(member_id));
        }
        if let Some(document_id) = filter.document_id {
            condition = condition.add(reservation::Column::DocumentId.eq(document_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(reservation::Column::Status.eq(status));
        }

        let reservations = Reservation::find()
            .filter(condition)
            .order_by_desc(reservation::Column::ReservationDate)
            .order_by_desc(reservation::Column::Id)
            .all(&self.db)
            .await?;

        let (documents, members) = self
            .related(reservations.iter().map(|r| (r.document_id, r.member_id)))
            .await?;

        let now = Utc::now();
        Ok(reservations
            .into_iter()
            .map(|r| {
                let document = documents.get(&r.document_id);
                let member = members.get(&r.member_id);
                reservation_view(r, document, member, now)
            })
            .collect())
    }

    pub async fn get_reservation(
        &self,
        actor: Actor,
        reservation_id: i32,
    ) -> Result<ReservationView, DomainError> {
        let reservation = Reservation::find_by_id(reservation_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation"))?;

        if !actor.role.is_staff() && reservation.member_id != actor.user_id {
            return Err(DomainError::Forbidden(
                "members may only view their own reservations".into(),
            ));
        }

        let document = Document::find_by_id(reservation.document_id)
            .one(&self.db)
            .await?;
        let member = User::find_by_id(reservation.member_id).one(&self.db).await?;
        Ok(reservation_view(
            reservation,
            document.as_ref(),
            member.as_ref(),
            Utc::now(),
        ))
    }

    /// Fetch the documents and members referenced by a set of rows
    async fn related(
        &self,
        refs: impl Iterator<Item = (i32, i32)>,
    ) -> Result<(HashMap<i32, document::Model>, HashMap<i32, user::Model>), DomainError> {
        let (document_ids, member_ids): (Vec<i32>, Vec<i32>) = refs.unzip();

        let mut documents = HashMap::new();
        let mut members = HashMap::new();

        if !document_ids.is_empty() {
            for d in Document::find()
                .filter(document::Column::Id.is_in(document_ids))
                .all(&self.db)
                .await?
            {
                documents.insert(d.id, d);
            }
        }

        if !member_ids.is_empty() {
            for m in User::find()
                .filter(user::Column::Id.is_in(member_ids))
                .all(&self.db)
                .await?
            {
                members.insert(m.id, m);
            }
        }

        Ok((documents, members))
    }
}
