//! Command structs for engine operations.
//!
//! These types group parameters for the collaborator write paths (fee-charge
//! generation, payment collection, opening balances, discounts,
//! adjustments), keeping call sites readable and avoiding long argument
//! lists.

use chrono::NaiveDate;

use crate::EntryType;

/// One fee head inside a charge batch (e.g. "Tuition", "Transport").
#[derive(Clone, Debug)]
pub struct FeeLine {
    pub particulars: String,
    pub amount_minor: i64,
}

impl FeeLine {
    #[must_use]
    pub fn new(particulars: impl Into<String>, amount_minor: i64) -> Self {
        Self {
            particulars: particulars.into(),
            amount_minor,
        }
    }
}

/// Generate the fee charges of one student for one session.
#[derive(Clone, Debug)]
pub struct ChargeFeesCmd {
    pub student_id: i64,
    pub session_id: i64,
    pub charged_on: NaiveDate,
    pub lines: Vec<FeeLine>,
}

impl ChargeFeesCmd {
    #[must_use]
    pub fn new(student_id: i64, session_id: i64, charged_on: NaiveDate) -> Self {
        Self {
            student_id,
            session_id,
            charged_on,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn line(mut self, particulars: impl Into<String>, amount_minor: i64) -> Self {
        self.lines.push(FeeLine::new(particulars, amount_minor));
        self
    }
}

/// Collect a payment: one receipt plus its CREDIT ledger entry.
#[derive(Clone, Debug)]
pub struct CollectPaymentCmd {
    pub student_id: i64,
    pub session_id: i64,
    pub amount_minor: i64,
    pub paid_on: NaiveDate,
    pub note: Option<String>,
}

impl CollectPaymentCmd {
    #[must_use]
    pub fn new(student_id: i64, session_id: i64, amount_minor: i64, paid_on: NaiveDate) -> Self {
        Self {
            student_id,
            session_id,
            amount_minor,
            paid_on,
            note: None,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Import a carried-forward balance, dated at the session start (usually
/// earlier than existing entries, so the append path recomputes).
#[derive(Clone, Debug)]
pub struct OpeningBalanceCmd {
    pub student_id: i64,
    pub session_id: i64,
    pub amount_minor: i64,
    pub as_of: NaiveDate,
    pub particulars: String,
}

impl OpeningBalanceCmd {
    #[must_use]
    pub fn new(student_id: i64, session_id: i64, amount_minor: i64, as_of: NaiveDate) -> Self {
        Self {
            student_id,
            session_id,
            amount_minor,
            as_of,
            particulars: "Opening balance".to_string(),
        }
    }

    #[must_use]
    pub fn particulars(mut self, particulars: impl Into<String>) -> Self {
        self.particulars = particulars.into();
        self
    }
}

/// Credit a discount against a student's dues.
#[derive(Clone, Debug)]
pub struct DiscountCmd {
    pub student_id: i64,
    pub session_id: i64,
    pub amount_minor: i64,
    pub granted_on: NaiveDate,
    pub particulars: String,
}

impl DiscountCmd {
    #[must_use]
    pub fn new(student_id: i64, session_id: i64, amount_minor: i64, granted_on: NaiveDate) -> Self {
        Self {
            student_id,
            session_id,
            amount_minor,
            granted_on,
            particulars: "Discount".to_string(),
        }
    }

    #[must_use]
    pub fn particulars(mut self, particulars: impl Into<String>) -> Self {
        self.particulars = particulars.into();
        self
    }
}

/// A manual correction entry, debit or credit.
#[derive(Clone, Debug)]
pub struct AdjustmentCmd {
    pub student_id: i64,
    pub session_id: i64,
    pub entry_type: EntryType,
    pub amount_minor: i64,
    pub adjusted_on: NaiveDate,
    pub particulars: String,
}

impl AdjustmentCmd {
    #[must_use]
    pub fn new(
        student_id: i64,
        session_id: i64,
        entry_type: EntryType,
        amount_minor: i64,
        adjusted_on: NaiveDate,
    ) -> Self {
        Self {
            student_id,
            session_id,
            entry_type,
            amount_minor,
            adjusted_on,
            particulars: "Adjustment".to_string(),
        }
    }

    #[must_use]
    pub fn particulars(mut self, particulars: impl Into<String>) -> Self {
        self.particulars = particulars.into();
        self
    }
}
