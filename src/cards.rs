//! Card types, decks, shared damage piles, and the upgrade shop.
//!
//! Card names are the strings clients send and receive (`"MoveII"`,
//! `"Spam"`, `"AdminPrivilege"`, ...).

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Serialize, Serializer};

/// A programming card from a player's personal deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramCard {
    MoveI,
    MoveII,
    MoveIII,
    BackUp,
    TurnRight,
    TurnLeft,
    UTurn,
    PowerUp,
    Again,
}

/// Composition of a fresh personal programming deck.
pub const STARTER_DECK: [(ProgramCard, usize); 9] = [
    (ProgramCard::MoveI, 5),
    (ProgramCard::MoveII, 3),
    (ProgramCard::MoveIII, 1),
    (ProgramCard::BackUp, 1),
    (ProgramCard::TurnRight, 3),
    (ProgramCard::TurnLeft, 3),
    (ProgramCard::UTurn, 1),
    (ProgramCard::PowerUp, 1),
    (ProgramCard::Again, 2),
];

/// A damage card from one of the shared piles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DamageCard {
    Spam,
    Worm,
    Virus,
    Trojan,
}

pub const ALL_DAMAGE: [DamageCard; 4] = [
    DamageCard::Spam,
    DamageCard::Worm,
    DamageCard::Virus,
    DamageCard::Trojan,
];

impl DamageCard {
    pub const fn name(self) -> &'static str {
        match self {
            DamageCard::Spam => "Spam",
            DamageCard::Worm => "Worm",
            DamageCard::Virus => "Virus",
            DamageCard::Trojan => "Trojan",
        }
    }

    pub fn from_name(name: &str) -> Option<DamageCard> {
        ALL_DAMAGE.into_iter().find(|d| d.name() == name)
    }

    /// Cards in a full shared pile.
    pub const fn pile_size(self) -> u32 {
        match self {
            DamageCard::Spam => 38,
            DamageCard::Worm => 6,
            DamageCard::Virus => 18,
            DamageCard::Trojan => 12,
        }
    }
}

/// Any card that can sit in a hand or a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Card {
    Program(ProgramCard),
    Damage(DamageCard),
}

impl Card {
    pub const fn name(self) -> &'static str {
        match self {
            Card::Program(p) => match p {
                ProgramCard::MoveI => "MoveI",
                ProgramCard::MoveII => "MoveII",
                ProgramCard::MoveIII => "MoveIII",
                ProgramCard::BackUp => "BackUp",
                ProgramCard::TurnRight => "TurnRight",
                ProgramCard::TurnLeft => "TurnLeft",
                ProgramCard::UTurn => "UTurn",
                ProgramCard::PowerUp => "PowerUp",
                ProgramCard::Again => "Again",
            },
            Card::Damage(d) => d.name(),
        }
    }

    pub const fn is_again(self) -> bool {
        matches!(self, Card::Program(ProgramCard::Again))
    }

    pub const fn damage(self) -> Option<DamageCard> {
        match self {
            Card::Damage(d) => Some(d),
            Card::Program(_) => None,
        }
    }
}

/// Error returned for an unrecognized card name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown card: '{0}'")]
pub struct UnknownCardName(pub String);

impl FromStr for Card {
    type Err = UnknownCardName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let program = STARTER_DECK
            .iter()
            .map(|(p, _)| Card::Program(*p))
            .find(|c| c.name() == s);
        program
            .or_else(|| DamageCard::from_name(s).map(Card::Damage))
            .ok_or_else(|| UnknownCardName(s.to_string()))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl Serialize for DamageCard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Builds a shuffled personal programming deck.
pub fn starter_deck(rng: &mut impl Rng) -> Vec<Card> {
    let mut deck: Vec<Card> = STARTER_DECK
        .iter()
        .flat_map(|(card, n)| std::iter::repeat(Card::Program(*card)).take(*n))
        .collect();
    deck.shuffle(rng);
    deck
}

/// The four shared damage piles, tracked by remaining count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamagePiles {
    counts: [u32; 4],
}

impl Default for DamagePiles {
    fn default() -> Self {
        DamagePiles {
            counts: ALL_DAMAGE.map(DamageCard::pile_size),
        }
    }
}

impl DamagePiles {
    pub fn empty() -> Self {
        DamagePiles { counts: [0; 4] }
    }

    pub fn remaining(&self, kind: DamageCard) -> u32 {
        self.counts[kind as usize]
    }

    pub fn set_remaining(&mut self, kind: DamageCard, count: u32) {
        self.counts[kind as usize] = count;
    }

    /// Takes one card from a pile; false if the pile is empty.
    pub fn take(&mut self, kind: DamageCard) -> bool {
        let count = &mut self.counts[kind as usize];
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    pub fn give_back(&mut self, kind: DamageCard) {
        self.counts[kind as usize] += 1;
    }

    /// Piles other than Spam that still hold cards.
    pub fn pickable(&self) -> Vec<DamageCard> {
        ALL_DAMAGE
            .into_iter()
            .filter(|d| *d != DamageCard::Spam && self.remaining(*d) > 0)
            .collect()
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Upgrade cards offered in the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpgradeCard {
    AdminPrivilege,
    RearLaser,
    MemorySwap,
    SpamBlocker,
}

pub const ALL_UPGRADES: [UpgradeCard; 4] = [
    UpgradeCard::AdminPrivilege,
    UpgradeCard::RearLaser,
    UpgradeCard::MemorySwap,
    UpgradeCard::SpamBlocker,
];

impl UpgradeCard {
    pub const fn name(self) -> &'static str {
        match self {
            UpgradeCard::AdminPrivilege => "AdminPrivilege",
            UpgradeCard::RearLaser => "RearLaser",
            UpgradeCard::MemorySwap => "MemorySwap",
            UpgradeCard::SpamBlocker => "SpamBlocker",
        }
    }

    pub fn from_name(name: &str) -> Option<UpgradeCard> {
        ALL_UPGRADES.into_iter().find(|u| u.name() == name)
    }

    /// Energy cost.
    pub const fn cost(self) -> u32 {
        match self {
            UpgradeCard::AdminPrivilege => 3,
            UpgradeCard::RearLaser => 2,
            UpgradeCard::MemorySwap => 1,
            UpgradeCard::SpamBlocker => 3,
        }
    }

    pub const fn is_permanent(self) -> bool {
        matches!(self, UpgradeCard::AdminPrivilege | UpgradeCard::RearLaser)
    }
}

impl Serialize for UpgradeCard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// How the shop changed at the start of an upgrade phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShopRefresh {
    /// Empty slots were filled with these cards.
    Refilled(Vec<UpgradeCard>),
    /// Every card was replaced; these are the new ones.
    Exchanged(Vec<UpgradeCard>),
}

/// The shared upgrade shop.
#[derive(Debug, Clone)]
pub struct UpgradeShop {
    deck: Vec<UpgradeCard>,
    discard: Vec<UpgradeCard>,
    slots: Vec<Option<UpgradeCard>>,
    bought_since_refresh: bool,
    refreshed_once: bool,
}

impl UpgradeShop {
    /// Creates a shop with `copies` of each upgrade, shuffled.
    pub fn new(copies: usize, rng: &mut impl Rng) -> Self {
        let mut deck: Vec<UpgradeCard> = ALL_UPGRADES
            .iter()
            .flat_map(|u| std::iter::repeat(*u).take(copies))
            .collect();
        deck.shuffle(rng);
        UpgradeShop {
            deck,
            discard: Vec::new(),
            slots: Vec::new(),
            bought_since_refresh: false,
            refreshed_once: false,
        }
    }

    pub fn offered(&self) -> Vec<UpgradeCard> {
        self.slots.iter().flatten().copied().collect()
    }

    fn draw(&mut self, rng: &mut impl Rng) -> Option<UpgradeCard> {
        if self.deck.is_empty() {
            self.deck.append(&mut self.discard);
            self.deck.shuffle(rng);
        }
        self.deck.pop()
    }

    /// Prepares the shop for an upgrade phase with one slot per player.
    ///
    /// A full shop that nobody bought from since the last refresh is
    /// exchanged; otherwise empty slots are refilled.
    pub fn refresh(&mut self, capacity: usize, rng: &mut impl Rng) -> ShopRefresh {
        self.slots.resize(capacity, None);
        let full = self.slots.iter().all(Option::is_some);
        let exchange = self.refreshed_once && full && !self.bought_since_refresh;
        self.refreshed_once = true;
        self.bought_since_refresh = false;

        if exchange {
            for slot in self.slots.iter_mut() {
                if let Some(card) = slot.take() {
                    self.discard.push(card);
                }
            }
        }

        let mut dealt = Vec::new();
        for i in 0..self.slots.len() {
            if self.slots[i].is_none() {
                self.slots[i] = self.draw(rng);
                dealt.extend(self.slots[i]);
            }
        }

        if exchange {
            ShopRefresh::Exchanged(dealt)
        } else {
            ShopRefresh::Refilled(dealt)
        }
    }

    /// Removes a card from the shop. False if it is not on offer.
    pub fn take(&mut self, card: UpgradeCard) -> bool {
        match self.slots.iter_mut().find(|s| **s == Some(card)) {
            Some(slot) => {
                *slot = None;
                self.bought_since_refresh = true;
                true
            }
            None => false,
        }
    }
}
