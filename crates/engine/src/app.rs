//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::{
    clock::{SystemClock, SystemRandom},
    config::AssignmentReward,
    ports::{AuditRepo, ClockPort, CourseDataPort, PlayerRepo, RandomPort, SettlementRepo},
};
use crate::use_cases::{
    self,
    battle::{BattleHistory, GetBattleStatus, InitiateBattle},
    players::{Leaderboard, PlayerJournal, PlayerProfiles},
    retry::RetryPolicy,
    rewards::{ClaimAssignmentReward, ClaimAttendanceReward, ClaimReward, RevokeAttendanceReward},
};

/// Main application state.
///
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub use_cases: UseCases,
}

/// Container for all use cases.
pub struct UseCases {
    pub players: use_cases::PlayerUseCases,
    pub battle: use_cases::BattleUseCases,
    pub rewards: use_cases::RewardUseCases,
}

impl App {
    /// Wire the use cases over `store` with the system clock and RNG.
    pub fn new<S>(
        store: Arc<S>,
        course_data: Arc<dyn CourseDataPort>,
        retry: RetryPolicy,
        assignment_reward: AssignmentReward,
    ) -> Self
    where
        S: PlayerRepo + SettlementRepo + AuditRepo + 'static,
    {
        Self::with_runtime(
            store,
            course_data,
            Arc::new(SystemClock::new()),
            Arc::new(SystemRandom::new()),
            retry,
            assignment_reward,
        )
    }

    /// Wire the use cases with an explicit clock and RNG.
    pub fn with_runtime<S>(
        store: Arc<S>,
        course_data: Arc<dyn CourseDataPort>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        retry: RetryPolicy,
        assignment_reward: AssignmentReward,
    ) -> Self
    where
        S: PlayerRepo + SettlementRepo + AuditRepo + 'static,
    {
        let players: Arc<dyn PlayerRepo> = store.clone();
        let settlement: Arc<dyn SettlementRepo> = store.clone();
        let audit: Arc<dyn AuditRepo> = store;

        let player_use_cases = use_cases::PlayerUseCases::new(
            Arc::new(PlayerProfiles::new(players.clone(), clock.clone())),
            Arc::new(PlayerJournal::new(players.clone(), audit.clone())),
            Arc::new(Leaderboard::new(players.clone())),
        );

        let battle = use_cases::BattleUseCases::new(
            Arc::new(InitiateBattle::new(
                players.clone(),
                settlement.clone(),
                clock.clone(),
                random,
                retry.clone(),
            )),
            Arc::new(GetBattleStatus::new(players.clone(), clock.clone())),
            Arc::new(BattleHistory::new(players.clone(), audit)),
        );

        let ledger = Arc::new(ClaimReward::new(
            players.clone(),
            settlement.clone(),
            clock.clone(),
            retry.clone(),
        ));
        let rewards = use_cases::RewardUseCases::new(
            Arc::new(ClaimAttendanceReward::new(
                players.clone(),
                settlement.clone(),
                clock.clone(),
                retry.clone(),
            )),
            Arc::new(RevokeAttendanceReward::new(
                players.clone(),
                settlement,
                clock,
                retry,
            )),
            Arc::new(ClaimAssignmentReward::new(
                players,
                course_data,
                ledger,
                assignment_reward,
            )),
        );

        Self {
            use_cases: UseCases {
                players: player_use_cases,
                battle,
                rewards,
            },
        }
    }
}
