use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::RngCore;

use crate::card_api::{ApiError, CardQuery};
use crate::config::DraftPolicy;
use crate::models::card::Card;
use crate::models::draft_state::{DraftAction, DraftState, DraftStore};
use crate::opt::*;

pub mod card_loader;
pub mod card_matcher;
pub mod deck_export;
pub mod deck_stats;
pub mod land_swap;
pub mod pick_offer;
pub mod rarity_balancer;
pub mod tribal_synergy;

use deck_stats::DeckStats;
use land_swap::LandSwap;

const SESSION_ID_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SESSION_ID_LENGTH: usize = 8;

fn log(s: String) {
    log_if(s.as_str(), DbgFlg::Draft);
}

/// Remote work the session can re-issue after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRequest {
    CommanderCandidates,
    RerollCommanders,
    CardPool,
    BasicLands,
}

impl Display for PendingRequest {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            PendingRequest::CommanderCandidates => write!(f, "loading commanders"),
            PendingRequest::RerollCommanders => write!(f, "rerolling commanders"),
            PendingRequest::CardPool => write!(f, "loading the card pool"),
            PendingRequest::BasicLands => write!(f, "loading basic lands"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionError {
    pub request: PendingRequest,
    pub error: ApiError,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} failed: {}", self.request, self.error)
    }
}

/// Set while the session waits on the card service. Clones share the flag,
/// so the REPL can watch it while a request is in flight.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag(Arc<AtomicBool>);

impl LoadingFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self, loading: bool) {
        self.0.store(loading, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LandOutcome {
    Added(Card),
    SwapProposed { remove: Card, land: Card },
}

/// One draft from commander choice to a complete deck. Owns the store and
/// is its only writer.
pub struct DraftSession {
    id: String,
    store: DraftStore,
    api: Arc<dyn CardQuery>,
    rng: Box<dyn RngCore>,
    policy: DraftPolicy,
    commander_candidates: Vec<Card>,
    basic_lands: Vec<Card>,
    land_swap: LandSwap,
    loading: LoadingFlag,
    last_error: Option<SessionError>,
}

impl DraftSession {
    pub fn new(api: Arc<dyn CardQuery>, policy: DraftPolicy, rng: Box<dyn RngCore>) -> Self {
        let id = nanoid::nanoid!(
            SESSION_ID_LENGTH,
            &SESSION_ID_ALPHABET.chars().collect::<Vec<char>>()
        );
        log(format!("Session {} started", id));

        DraftSession {
            id,
            store: DraftStore::new(&policy),
            api,
            rng,
            policy,
            commander_candidates: Vec::new(),
            basic_lands: Vec::new(),
            land_swap: LandSwap::Idle,
            loading: LoadingFlag::default(),
            last_error: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &DraftState {
        self.store.state()
    }

    pub fn policy(&self) -> &DraftPolicy {
        &self.policy
    }

    pub fn commander_candidates(&self) -> &[Card] {
        &self.commander_candidates
    }

    pub fn land_swap(&self) -> &LandSwap {
        &self.land_swap
    }

    pub fn loading_flag(&self) -> LoadingFlag {
        self.loading.clone()
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    pub async fn load_commander_candidates(&mut self) -> Res<()> {
        if self.state().is_commander_selected {
            return Err("a commander is already selected".to_string());
        }
        self.perform(PendingRequest::CommanderCandidates).await
    }

    /// Replaces the candidates with a fresh set. A reroll is spent only
    /// once the new set has arrived.
    pub async fn reroll_commanders(&mut self) -> Res<()> {
        if self.state().is_commander_selected {
            return Err("a commander is already selected".to_string());
        }
        if !self.state().can_reroll() {
            return Err("no rerolls left".to_string());
        }
        self.perform(PendingRequest::RerollCommanders).await
    }

    /// Selects a candidate and loads the card pool behind it. A failed pool
    /// load keeps the commander and can be retried.
    pub async fn choose_commander(&mut self, index: usize) -> Res<Card> {
        if self.state().is_commander_selected {
            return Err("a commander is already selected".to_string());
        }
        let commander = self
            .commander_candidates
            .get(index)
            .cloned()
            .ok_or_else(|| format!("no commander candidate #{}", index + 1))?;

        self.store
            .dispatch(DraftAction::SelectCommander(commander.clone()));
        self.commander_candidates.clear();
        log(format!("Commander {} selected", commander.name));

        self.perform(PendingRequest::CardPool).await?;
        Ok(commander)
    }

    /// Takes a card from the current offer and moves on to the next one.
    pub async fn pick(&mut self, index: usize) -> Res<Card> {
        if !pick_offer::can_offer(self.state()) {
            return Err("nothing to pick right now".to_string());
        }
        let card = self
            .state()
            .current_pick
            .get(index)
            .cloned()
            .ok_or_else(|| format!("no card #{} in this pick", index + 1))?;

        if !self.store.dispatch(DraftAction::AddCard(card.clone())) {
            return Err(format!("{} is already in the deck", card.name));
        }
        log(format!(
            "Picked {} ({}/{})",
            card.name,
            self.state().main_deck_len(),
            self.state().deck_capacity()
        ));

        if self.state().is_deck_full() {
            self.store.dispatch(DraftAction::CompleteDraft);
            log(format!("Draft {} complete", self.id));
        } else {
            self.next_offer();
        }
        self.detect_synergies().await;

        Ok(card)
    }

    /// Basic lands for the commander's identity, fetched once per session.
    pub async fn basic_lands(&mut self) -> Res<Vec<Card>> {
        if !self.state().is_commander_selected {
            return Err("select a commander first".to_string());
        }
        if self.basic_lands.is_empty() {
            self.perform(PendingRequest::BasicLands).await?;
        }
        Ok(self.basic_lands.clone())
    }

    /// Adds a basic land, or proposes a swap when the deck is already full.
    pub fn add_basic_land(&mut self, land: Card) -> Res<LandOutcome> {
        if !self.state().is_commander_selected {
            return Err("select a commander first".to_string());
        }
        if !land.is_basic_land() {
            return Err(format!("{} is not a basic land", land.name));
        }

        if !self.state().is_deck_full() {
            if !self.store.dispatch(DraftAction::AddCard(land.clone())) {
                return Err(format!("could not add {}", land.name));
            }
            if self.state().is_deck_full() {
                self.store.dispatch(DraftAction::CompleteDraft);
            }
            return Ok(LandOutcome::Added(land));
        }

        let remove = self
            .land_swap
            .request(&self.store, land.clone(), self.rng.as_mut())
            .cloned()
            .ok_or_else(|| "the deck has no non-land card to swap out".to_string())?;
        let land = self.land_swap.land().cloned().unwrap_or(land);
        log(format!("Proposed swapping {} for {}", remove.name, land.name));

        Ok(LandOutcome::SwapProposed { remove, land })
    }

    /// Applies the pending swap. Returns the removed card and the added land.
    pub fn confirm_land_swap(&mut self) -> Res<(Card, Card)> {
        let (remove, land) = match (self.land_swap.candidate(), self.land_swap.land()) {
            (Some(remove), Some(land)) if self.land_swap.is_pending() => {
                (remove.clone(), land.clone())
            }
            _ => return Err("no land swap to confirm".to_string()),
        };

        if self.land_swap.confirm(&mut self.store) {
            Ok((remove, land))
        } else {
            Err(format!("{} is no longer in the deck", remove.name))
        }
    }

    pub fn cancel_land_swap(&mut self) {
        self.land_swap.cancel();
    }

    pub fn set_desired_land_count(&mut self, count: i64) -> u32 {
        self.store.dispatch(DraftAction::SetDesiredLandCount(count));
        self.state().desired_land_count
    }

    pub fn toggle_edhrec_rank(&mut self) -> bool {
        self.store.dispatch(DraftAction::ToggleEdhrecRank);
        self.state().show_edhrec_rank
    }

    pub fn toggle_debug_info(&mut self) -> bool {
        self.store.dispatch(DraftAction::ToggleDebugInfo);
        self.state().show_debug_info
    }

    /// Re-issues the request that failed last.
    pub async fn retry(&mut self) -> Res<()> {
        let request = self
            .last_error
            .as_ref()
            .map(|err| err.request)
            .ok_or_else(|| "nothing to retry".to_string())?;
        self.perform(request).await
    }

    pub fn stats(&self) -> DeckStats {
        DeckStats::of(self.state(), &self.policy.target)
    }

    pub fn export(&self) -> String {
        deck_export::export_decklist(self.state())
    }

    async fn perform(&mut self, request: PendingRequest) -> Res<()> {
        self.loading.set(true);
        let result = match request {
            PendingRequest::CommanderCandidates => self.fetch_commanders(false).await,
            PendingRequest::RerollCommanders => self.fetch_commanders(true).await,
            PendingRequest::CardPool => self.fetch_pool().await,
            PendingRequest::BasicLands => self.fetch_basic_lands().await,
        };
        self.loading.set(false);

        match result {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(error) => {
                let err = SessionError { request, error };
                log(format!("{}", err));
                let message = err.to_string();
                self.last_error = Some(err);
                Err(message)
            }
        }
    }

    async fn fetch_commanders(&mut self, reroll: bool) -> Result<(), ApiError> {
        let candidates =
            card_loader::fetch_commander_candidates(self.api.as_ref(), &self.policy).await?;
        if reroll {
            self.store.dispatch(DraftAction::RerollCommander);
        }
        self.commander_candidates = candidates;
        Ok(())
    }

    async fn fetch_pool(&mut self) -> Result<(), ApiError> {
        if !self.state().available_cards.is_empty() {
            return Ok(());
        }
        let identity = self
            .state()
            .commander
            .as_ref()
            .map(|commander| commander.color_identity.clone())
            .unwrap_or_default();
        let filter = pick_offer::pool_filter(&identity).to_string();

        let pool = card_loader::fetch_card_pool(
            self.api.as_ref(),
            &filter,
            &self.policy,
            self.rng.as_mut(),
        )
        .await?;
        self.store.dispatch(DraftAction::SetAvailableCards(pool));
        self.next_offer();
        Ok(())
    }

    async fn fetch_basic_lands(&mut self) -> Result<(), ApiError> {
        let identity = self
            .state()
            .commander
            .as_ref()
            .map(|commander| commander.color_identity.clone())
            .unwrap_or_default();
        self.basic_lands = card_loader::fetch_basic_lands(self.api.as_ref(), &identity).await?;
        Ok(())
    }

    fn next_offer(&mut self) {
        let offer = pick_offer::generate_offer(self.store.state(), &self.policy, self.rng.as_mut());
        if offer.is_empty() && pick_offer::can_offer(self.store.state()) {
            log("Candidate pool exhausted".to_string());
        }
        self.store.dispatch(DraftAction::SetCurrentPick(offer));
        self.state().current_pick.dbg_if(DbgFlg::Draft);
    }

    /// Registers every subtype that crossed the threshold. A failed fetch
    /// only logs; the subtype is picked up again after the next pick.
    async fn detect_synergies(&mut self) {
        for subtype in tribal_synergy::unregistered_synergies(self.store.state(), &self.policy) {
            let fetched = tribal_synergy::fetch_synergy_candidates(
                self.api.as_ref(),
                &subtype,
                self.store.state(),
                &self.policy,
            )
            .await;

            match fetched {
                Ok(cards) => {
                    log_if(
                        &format!("Registered {} with {} cards", subtype, cards.len()),
                        DbgFlg::Synergy,
                    );
                    self.store
                        .dispatch(DraftAction::RegisterTribalSynergy { subtype, cards });
                }
                Err(err) => {
                    log_if(
                        &format!("Synergy fetch for {} failed: {}", subtype, err),
                        DbgFlg::Synergy,
                    );
                }
            }
        }
    }
}
