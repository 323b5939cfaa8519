use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Months, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::db_enum;
use crate::core::shared::error::ApiError;
use crate::core::shared::schema::{subscription_plans, user_subscriptions};
use crate::security::validation::{Validate, ValidationResult, Validator};

db_enum! {
    pub enum BillingInterval {
        Monthly => "monthly",
        Quarterly => "quarterly",
        Yearly => "yearly",
    }
}

impl BillingInterval {
    pub fn months(self) -> u32 {
        match self {
            BillingInterval::Monthly => 1,
            BillingInterval::Quarterly => 3,
            BillingInterval::Yearly => 12,
        }
    }

    /// End of a period that starts at `start`. Month arithmetic clamps to the
    /// last day of shorter months (Jan 31 + 1 month = Feb 28/29).
    pub fn period_end(self, start: DateTime<Utc>) -> Result<DateTime<Utc>, ApiError> {
        start
            .checked_add_months(Months::new(self.months()))
            .ok_or_else(|| ApiError::BadRequest("billing period out of range".to_string()))
    }
}

db_enum! {
    pub enum SubscriptionStatus {
        Trial => "trial",
        Active => "active",
        Paused => "paused",
        Cancelled => "cancelled",
        Expired => "expired",
        PastDue => "past_due",
    }
}

impl SubscriptionStatus {
    pub fn can_transition_to(self, next: SubscriptionStatus) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, next),
            (Trial, Active | Cancelled | Expired)
                | (Active, Paused | Cancelled | PastDue | Expired)
                | (Paused, Active | Cancelled)
                | (PastDue, Active | Cancelled | Expired)
        )
    }

    pub fn can_redeem(self) -> bool {
        matches!(self, SubscriptionStatus::Trial | SubscriptionStatus::Active)
    }

    pub fn can_renew(self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Trial | SubscriptionStatus::Active | SubscriptionStatus::PastDue
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = subscription_plans, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub currency: String,
    pub billing_interval: BillingInterval,
    pub wash_credits_per_period: i32,
    pub discount_percent: BigDecimal,
    pub trial_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub currency: String,
    pub billing_interval: Option<BillingInterval>,
    pub wash_credits_per_period: Option<i32>,
    pub discount_percent: Option<BigDecimal>,
    pub trial_days: Option<i32>,
    pub is_active: Option<bool>,
}

impl Validate for CreatePlanRequest {
    const REQUIRED: &'static [&'static str] = &["name", "price", "currency"];

    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .text(&self.name, "name", 120)
            .money(&self.price, "price")
            .currency(&self.currency, "currency")
            .opt(self.wash_credits_per_period, |v, c| {
                v.non_negative_int(c, "washCreditsPerPeriod")
            })
            .opt(self.discount_percent.as_ref(), |v, d| v.percent(d, "discountPercent"))
            .opt(self.trial_days, |v, d| v.range(d, "trialDays", Some(0), Some(365)))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub currency: Option<String>,
    pub billing_interval: Option<BillingInterval>,
    pub wash_credits_per_period: Option<i32>,
    pub discount_percent: Option<BigDecimal>,
    pub trial_days: Option<i32>,
    pub is_active: Option<bool>,
}

impl Validate for UpdatePlanRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.name.as_deref(), |v, n| v.text(n, "name", 120))
            .opt(self.price.as_ref(), |v, p| v.money(p, "price"))
            .opt(self.currency.as_deref(), |v, c| v.currency(c, "currency"))
            .opt(self.wash_credits_per_period, |v, c| {
                v.non_negative_int(c, "washCreditsPerPeriod")
            })
            .opt(self.discount_percent.as_ref(), |v, d| v.percent(d, "discountPercent"))
            .opt(self.trial_days, |v, d| v.range(d, "trialDays", Some(0), Some(365)))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPlansQuery {
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = user_subscriptions, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct UserSubscription {
    pub id: Uuid,
    pub user_id: String,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub wash_credits_remaining: i32,
    pub cancel_at_period_end: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserSubscription {
    /// Starts a subscription on `plan`. Plans with trial days begin in
    /// `trial` unless the caller opts out.
    pub fn start(
        user_id: String,
        plan: &SubscriptionPlan,
        with_trial: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, ApiError> {
        let trial = with_trial && plan.trial_days > 0;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            plan_id: plan.id,
            status: if trial {
                SubscriptionStatus::Trial
            } else {
                SubscriptionStatus::Active
            },
            current_period_start: now,
            current_period_end: plan.billing_interval.period_end(now)?,
            wash_credits_remaining: plan.wash_credits_per_period,
            cancel_at_period_end: false,
            cancelled_at: None,
            trial_ends_at: trial.then(|| now + Duration::days(i64::from(plan.trial_days))),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn transition(
        &mut self,
        next: SubscriptionStatus,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        if self.status == next {
            return Ok(());
        }
        if !self.status.can_transition_to(next) {
            return Err(ApiError::Conflict(format!(
                "Subscription cannot move from {} to {}",
                self.status, next
            )));
        }
        if next == SubscriptionStatus::Cancelled {
            self.cancelled_at = Some(now);
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn redeem(&mut self, credits: i32, now: DateTime<Utc>) -> Result<(), ApiError> {
        if !self.status.can_redeem() {
            return Err(ApiError::Conflict(format!(
                "Cannot redeem credits on a {} subscription",
                self.status
            )));
        }
        if self.wash_credits_remaining < credits {
            return Err(ApiError::Conflict(format!(
                "Insufficient wash credits: {} remaining",
                self.wash_credits_remaining
            )));
        }
        self.wash_credits_remaining -= credits;
        self.updated_at = now;
        Ok(())
    }

    /// Rolls the subscription into its next period. A subscription flagged
    /// `cancelAtPeriodEnd` is cancelled instead of renewed.
    pub fn renew(&mut self, plan: &SubscriptionPlan, now: DateTime<Utc>) -> Result<(), ApiError> {
        if !self.status.can_renew() {
            return Err(ApiError::Conflict(format!(
                "Cannot renew a {} subscription",
                self.status
            )));
        }
        if self.cancel_at_period_end {
            return self.transition(SubscriptionStatus::Cancelled, now);
        }
        let start = self.current_period_end;
        self.current_period_start = start;
        self.current_period_end = plan.billing_interval.period_end(start)?;
        self.wash_credits_remaining = plan.wash_credits_per_period;
        self.transition(SubscriptionStatus::Active, now)?;
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub user_id: String,
    pub plan_id: Uuid,
    pub start_trial: Option<bool>,
}

impl Validate for CreateSubscriptionRequest {
    const REQUIRED: &'static [&'static str] = &["userId", "planId"];

    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .length(&self.user_id, "userId", Some(1), Some(128))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    pub status: Option<SubscriptionStatus>,
    pub cancel_at_period_end: Option<bool>,
}

impl Validate for UpdateSubscriptionRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub credits: Option<i32>,
}

impl RedeemRequest {
    pub fn credits(&self) -> i32 {
        self.credits.unwrap_or(1)
    }
}

impl Validate for RedeemRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.credits, |v, c| v.range(c, "credits", Some(1), Some(1000)))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSubscriptionsQuery {
    pub user_id: Option<String>,
    pub plan_id: Option<Uuid>,
    pub status: Option<SubscriptionStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn plan(interval: BillingInterval, credits: i32, trial_days: i32) -> SubscriptionPlan {
        let now = Utc::now();
        SubscriptionPlan {
            id: Uuid::new_v4(),
            name: "Clean Paws".into(),
            description: None,
            price: BigDecimal::from(99),
            currency: "ILS".into(),
            billing_interval: interval,
            wash_credits_per_period: credits,
            discount_percent: BigDecimal::from(10),
            trial_days,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_period_end_clamps_month_end() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        let end = BillingInterval::Monthly.period_end(start).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap());
        let end = BillingInterval::Yearly.period_end(start).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_start_with_trial() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let p = plan(BillingInterval::Quarterly, 8, 14);
        let sub = UserSubscription::start("uid-1".into(), &p, true, now).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Trial);
        assert_eq!(sub.trial_ends_at, Some(Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()));
        assert_eq!(sub.current_period_end, Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap());
        assert_eq!(sub.wash_credits_remaining, 8);

        let sub = UserSubscription::start("uid-1".into(), &p, false, now).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.trial_ends_at.is_none());
    }

    #[test]
    fn test_redeem_rules() {
        let now = Utc::now();
        let p = plan(BillingInterval::Monthly, 2, 0);
        let mut sub = UserSubscription::start("uid-2".into(), &p, true, now).unwrap();
        sub.redeem(2, now).unwrap();
        assert_eq!(sub.wash_credits_remaining, 0);
        assert!(matches!(sub.redeem(1, now), Err(ApiError::Conflict(_))));

        let mut paused = UserSubscription::start("uid-3".into(), &p, true, now).unwrap();
        paused.transition(SubscriptionStatus::Paused, now).unwrap();
        assert!(matches!(paused.redeem(1, now), Err(ApiError::Conflict(_))));
    }

    #[test]
    fn test_renew_rolls_period_and_resets_credits() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let p = plan(BillingInterval::Monthly, 4, 7);
        let mut sub = UserSubscription::start("uid-4".into(), &p, true, start).unwrap();
        sub.redeem(3, start).unwrap();
        sub.renew(&p, start).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.current_period_start, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(sub.current_period_end, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(sub.wash_credits_remaining, 4);

        sub.cancel_at_period_end = true;
        sub.renew(&p, start).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert!(sub.cancelled_at.is_some());
        assert!(matches!(sub.renew(&p, start), Err(ApiError::Conflict(_))));
    }

    #[test]
    fn test_transitions() {
        use SubscriptionStatus::*;
        assert!(Trial.can_transition_to(Active));
        assert!(!Trial.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Active));
        assert!(PastDue.can_transition_to(Expired));
        for next in SubscriptionStatus::ALL {
            assert!(!Cancelled.can_transition_to(*next));
            assert!(!Expired.can_transition_to(*next));
        }
    }
}
