use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::DbResult;
use crate::db::models::UserId;
use crate::db::models::challenge::{
    Challenge, CompletionStatus, LeaderboardEntry, NewChallenge, UserChallenge,
};
use crate::db::models::energy::{DeviceType, EnergyReading, SmartDevice};
use crate::db::models::goal::{CommunityGoal, ContributionSummary, GoalContribution, NewCommunityGoal};
use crate::db::models::recommendation::Recommendation;
use crate::db::models::waste::{
    NewRecyclingCenter, NewWasteEntry, RecyclingCenter, WasteEntry, WasteSummaryRow, WasteType,
};
use crate::db::store::Store;

/// Hash-map backed [`Store`] used by the test suite and for running the
/// service without a database. The single mutex gives every operation the
/// same all-or-nothing behavior the Postgres transactions provide.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    challenges: Vec<Challenge>,
    user_challenges: Vec<UserChallenge>,
    leaderboard: HashMap<UserId, i64>,
    goals: Vec<CommunityGoal>,
    contributions: Vec<GoalContribution>,
    recommendations: Vec<Recommendation>,
    devices: Vec<SmartDevice>,
    readings: Vec<EnergyReading>,
    waste: Vec<WasteEntry>,
    centers: Vec<RecyclingCenter>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock poisoning only happens if a holder panicked; propagating the
        // panic to the caller is the right outcome in tests.
        self.inner.lock().unwrap()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_challenge(&self, new: &NewChallenge) -> DbResult<Challenge> {
        let mut inner = self.lock();
        let challenge = Challenge {
            id: inner.next_id(),
            title: new.title.clone(),
            description: new.description.clone(),
            start_date: new.start_date,
            end_date: new.end_date,
            points: new.points,
            created_at: Utc::now(),
        };
        inner.challenges.push(challenge.clone());
        Ok(challenge)
    }

    async fn list_challenges(&self) -> DbResult<Vec<Challenge>> {
        let mut challenges = self.lock().challenges.clone();
        challenges.sort_by_key(|c| std::cmp::Reverse(c.start_date));
        Ok(challenges)
    }

    async fn get_challenge(&self, id: i64) -> DbResult<Option<Challenge>> {
        Ok(self.lock().challenges.iter().find(|c| c.id == id).cloned())
    }

    async fn user_challenges(&self, user: UserId) -> DbResult<Vec<UserChallenge>> {
        Ok(self
            .lock()
            .user_challenges
            .iter()
            .filter(|uc| uc.user_id == user)
            .cloned()
            .collect())
    }

    async fn complete_challenge(
        &self,
        user: UserId,
        challenge: &Challenge,
        now: DateTime<Utc>,
    ) -> DbResult<CompletionStatus> {
        let mut inner = self.lock();

        let existing = inner
            .user_challenges
            .iter_mut()
            .find(|uc| uc.user_id == user && uc.challenge_id == challenge.id);

        match existing {
            Some(uc) if uc.completed => return Ok(CompletionStatus::AlreadyCompleted),
            Some(uc) => {
                uc.completed = true;
                uc.completed_at = Some(now);
            }
            None => {
                let id = inner.next_id();
                inner.user_challenges.push(UserChallenge {
                    id,
                    user_id: user,
                    challenge_id: challenge.id,
                    completed: true,
                    completed_at: Some(now),
                });
            }
        }

        let total = inner.leaderboard.entry(user).or_insert(0);
        *total += challenge.points;
        let total = *total;

        Ok(CompletionStatus::Completed {
            points_awarded: challenge.points,
            total,
        })
    }

    async fn top_leaderboard(&self, limit: i64) -> DbResult<Vec<LeaderboardEntry>> {
        let inner = self.lock();
        let mut entries: Vec<LeaderboardEntry> = inner
            .leaderboard
            .iter()
            .map(|(user_id, points)| LeaderboardEntry {
                user_id: *user_id,
                points: *points,
            })
            .collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.points));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn leaderboard_entry(&self, user: UserId) -> DbResult<Option<LeaderboardEntry>> {
        Ok(self.lock().leaderboard.get(&user).map(|points| LeaderboardEntry {
            user_id: user,
            points: *points,
        }))
    }

    async fn insert_goal(&self, new: &NewCommunityGoal) -> DbResult<CommunityGoal> {
        let mut inner = self.lock();
        let goal = CommunityGoal {
            id: inner.next_id(),
            title: new.title.clone(),
            description: new.description.clone(),
            target_energy_reduction: new.target_energy_reduction,
            start_date: new.start_date,
            end_date: new.end_date,
            current_progress: 0.0,
        };
        inner.goals.push(goal.clone());
        Ok(goal)
    }

    async fn list_goals(&self) -> DbResult<Vec<CommunityGoal>> {
        let mut goals = self.lock().goals.clone();
        goals.sort_by_key(|g| std::cmp::Reverse(g.start_date));
        Ok(goals)
    }

    async fn get_goal(&self, id: i64) -> DbResult<Option<CommunityGoal>> {
        Ok(self.lock().goals.iter().find(|g| g.id == id).cloned())
    }

    async fn record_contribution(
        &self,
        user: UserId,
        goal_id: i64,
        amount: f64,
        now: DateTime<Utc>,
    ) -> DbResult<ContributionSummary> {
        let mut inner = self.lock();

        let energy_contributed = match inner
            .contributions
            .iter_mut()
            .find(|c| c.user_id == user && c.goal_id == goal_id)
        {
            Some(c) => {
                c.energy_contributed += amount;
                c.updated_at = now;
                c.energy_contributed
            }
            None => {
                let id = inner.next_id();
                inner.contributions.push(GoalContribution {
                    id,
                    user_id: user,
                    goal_id,
                    energy_contributed: amount,
                    updated_at: now,
                });
                amount
            }
        };

        let goal = inner
            .goals
            .iter_mut()
            .find(|g| g.id == goal_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        goal.current_progress += amount;

        Ok(ContributionSummary {
            energy_contributed,
            current_progress: goal.current_progress,
            target_energy_reduction: goal.target_energy_reduction,
        })
    }

    async fn user_contributions(&self, user: UserId) -> DbResult<Vec<GoalContribution>> {
        Ok(self
            .lock()
            .contributions
            .iter()
            .filter(|c| c.user_id == user)
            .cloned()
            .collect())
    }

    async fn insert_recommendation(&self, user: UserId, text: &str) -> DbResult<Recommendation> {
        let mut inner = self.lock();
        let rec = Recommendation {
            id: inner.next_id(),
            user_id: user,
            text: text.to_string(),
            created_at: Utc::now(),
            is_read: false,
        };
        inner.recommendations.push(rec.clone());
        Ok(rec)
    }

    async fn unread_recommendations(&self, user: UserId) -> DbResult<Vec<Recommendation>> {
        Ok(self
            .lock()
            .recommendations
            .iter()
            .filter(|r| r.user_id == user && !r.is_read)
            .cloned()
            .collect())
    }

    async fn list_recommendations(&self, user: UserId) -> DbResult<Vec<Recommendation>> {
        Ok(self
            .lock()
            .recommendations
            .iter()
            .filter(|r| r.user_id == user)
            .cloned()
            .collect())
    }

    async fn mark_recommendation_read(&self, user: UserId, id: i64) -> DbResult<bool> {
        let mut inner = self.lock();
        match inner
            .recommendations
            .iter_mut()
            .find(|r| r.id == id && r.user_id == user)
        {
            Some(r) => {
                r.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_device(
        &self,
        user: UserId,
        name: &str,
        device_type: DeviceType,
        identifier: &str,
    ) -> DbResult<SmartDevice> {
        let mut inner = self.lock();
        let device = SmartDevice {
            id: inner.next_id(),
            user_id: user,
            device_name: name.to_string(),
            device_type,
            device_identifier: identifier.to_string(),
            is_active: true,
            last_sync: None,
        };
        inner.devices.push(device.clone());
        Ok(device)
    }

    async fn user_devices(&self, user: UserId) -> DbResult<Vec<SmartDevice>> {
        Ok(self
            .lock()
            .devices
            .iter()
            .filter(|d| d.user_id == user)
            .cloned()
            .collect())
    }

    async fn insert_reading(
        &self,
        user: UserId,
        device_id: i64,
        energy_consumed: f64,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<Option<EnergyReading>> {
        let mut inner = self.lock();
        let owned = inner
            .devices
            .iter()
            .any(|d| d.id == device_id && d.user_id == user);
        if !owned {
            return Ok(None);
        }

        let reading = EnergyReading {
            id: inner.next_id(),
            device_id,
            recorded_at,
            energy_consumed,
        };
        inner.readings.push(reading.clone());
        Ok(Some(reading))
    }

    async fn user_readings(&self, user: UserId) -> DbResult<Vec<EnergyReading>> {
        let inner = self.lock();
        let mut readings: Vec<EnergyReading> = inner
            .readings
            .iter()
            .filter(|r| {
                inner
                    .devices
                    .iter()
                    .any(|d| d.id == r.device_id && d.user_id == user)
            })
            .cloned()
            .collect();
        readings.sort_by_key(|r| std::cmp::Reverse(r.recorded_at));
        Ok(readings)
    }

    async fn total_energy(&self, user: UserId) -> DbResult<f64> {
        let inner = self.lock();
        Ok(inner
            .readings
            .iter()
            .filter(|r| {
                inner
                    .devices
                    .iter()
                    .any(|d| d.id == r.device_id && d.user_id == user)
            })
            .map(|r| r.energy_consumed)
            .sum())
    }

    async fn owns_device_type(&self, user: UserId, device_type: DeviceType) -> DbResult<bool> {
        Ok(self
            .lock()
            .devices
            .iter()
            .any(|d| d.user_id == user && d.device_type == device_type))
    }

    async fn insert_waste_entry(
        &self,
        user: UserId,
        new: &NewWasteEntry,
        now: DateTime<Utc>,
    ) -> DbResult<WasteEntry> {
        let mut inner = self.lock();
        let entry = WasteEntry {
            id: inner.next_id(),
            user_id: user,
            waste_type: new.waste_type,
            quantity: new.quantity,
            logged_at: new.logged_at.unwrap_or(now),
        };
        inner.waste.push(entry.clone());
        Ok(entry)
    }

    async fn user_waste_entries(&self, user: UserId) -> DbResult<Vec<WasteEntry>> {
        let mut entries: Vec<WasteEntry> = self
            .lock()
            .waste
            .iter()
            .filter(|w| w.user_id == user)
            .cloned()
            .collect();
        entries.sort_by_key(|w| std::cmp::Reverse(w.logged_at));
        Ok(entries)
    }

    async fn waste_summary(&self, user: UserId) -> DbResult<Vec<WasteSummaryRow>> {
        let inner = self.lock();
        let mut totals: HashMap<WasteType, f64> = HashMap::new();
        for entry in inner.waste.iter().filter(|w| w.user_id == user) {
            *totals.entry(entry.waste_type).or_insert(0.0) += entry.quantity;
        }

        let mut rows: Vec<WasteSummaryRow> = totals
            .into_iter()
            .map(|(waste_type, total_quantity)| WasteSummaryRow {
                waste_type,
                total_quantity,
            })
            .collect();
        rows.sort_by_key(|r| r.waste_type as u8);
        Ok(rows)
    }

    async fn insert_center(&self, new: &NewRecyclingCenter) -> DbResult<RecyclingCenter> {
        let mut inner = self.lock();
        let center = RecyclingCenter {
            id: inner.next_id(),
            name: new.name.clone(),
            address: new.address.clone(),
            latitude: new.latitude,
            longitude: new.longitude,
            contact_email: new.contact_email.clone(),
            contact_phone: new.contact_phone.clone(),
        };
        inner.centers.push(center.clone());
        Ok(center)
    }

    async fn list_centers(&self) -> DbResult<Vec<RecyclingCenter>> {
        let mut centers = self.lock().centers.clone();
        centers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(centers)
    }
}
