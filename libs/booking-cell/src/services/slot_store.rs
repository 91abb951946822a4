// libs/booking-cell/src/services/slot_store.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{BookingError, CreateSlotRequest, Slot, SlotAvailability, SlotSearchQuery};

/// Proof of a successful capacity reservation. Handed back by `reserve` so
/// the booking engine can undo the increment if appointment persistence
/// fails afterwards.
#[derive(Debug)]
pub struct ReservationToken {
    slot_id: Uuid,
}

impl ReservationToken {
    pub fn slot_id(&self) -> Uuid {
        self.slot_id
    }
}

/// Owner of all slot records and their capacity counters.
///
/// Each slot lives behind its own mutex, so reserve/release on one slot are
/// fully serialized while operations on different slots proceed in
/// parallel. The outer map lock is only held long enough to look up or
/// insert an entry, never across a slot mutation.
pub struct SlotStore {
    slots: RwLock<HashMap<Uuid, Arc<Mutex<Slot>>>>,
}

impl Default for SlotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self, request: CreateSlotRequest) -> Result<Slot, BookingError> {
        if request.capacity == 0 {
            return Err(BookingError::ValidationError(
                "slot capacity must be at least 1".to_string(),
            ));
        }
        if request.duration_minutes <= 0 {
            return Err(BookingError::ValidationError(
                "slot duration must be positive".to_string(),
            ));
        }
        let now = Utc::now();
        if request.start_time <= now {
            return Err(BookingError::ValidationError(
                "slot start time must be in the future".to_string(),
            ));
        }

        let slot = Slot {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            clinic_id: request.clinic_id,
            start_time: request.start_time,
            duration_minutes: request.duration_minutes,
            capacity: request.capacity,
            booked_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.slots
            .write()
            .await
            .insert(slot.id, Arc::new(Mutex::new(slot.clone())));

        info!(
            "Slot {} created for doctor {} at {} (capacity {})",
            slot.id, slot.doctor_id, slot.start_time, slot.capacity
        );
        Ok(slot)
    }

    async fn entry(&self, slot_id: Uuid) -> Result<Arc<Mutex<Slot>>, BookingError> {
        self.slots
            .read()
            .await
            .get(&slot_id)
            .cloned()
            .ok_or(BookingError::SlotNotFound)
    }

    /// Point-in-time copy of a single slot.
    pub async fn get(&self, slot_id: Uuid) -> Result<Slot, BookingError> {
        let entry = self.entry(slot_id).await?;
        let slot = entry.lock().await;
        Ok(slot.clone())
    }

    /// Claim one unit of the slot's capacity.
    ///
    /// Succeeds only while the slot is active, starts strictly in the
    /// future, and has remaining capacity. Two concurrent reserves on a
    /// slot with one unit left resolve to exactly one success.
    pub async fn reserve(&self, slot_id: Uuid) -> Result<ReservationToken, BookingError> {
        let entry = self.entry(slot_id).await?;
        let mut slot = entry.lock().await;

        if !slot.is_active || slot.start_time <= Utc::now() || slot.is_full() {
            debug!(
                "Reservation refused for slot {} (active={}, booked={}/{})",
                slot_id, slot.is_active, slot.booked_count, slot.capacity
            );
            return Err(BookingError::SlotUnavailable);
        }

        slot.booked_count += 1;
        slot.updated_at = Utc::now();
        debug!(
            "Reserved one unit on slot {} ({}/{})",
            slot_id, slot.booked_count, slot.capacity
        );
        Ok(ReservationToken { slot_id })
    }

    /// Give one unit of capacity back.
    ///
    /// A release at zero is refused rather than floored silently: a caller
    /// releasing a unit that was never reserved is a bug upstream and must
    /// not be masked.
    pub async fn release(&self, slot_id: Uuid) -> Result<(), BookingError> {
        let entry = self.entry(slot_id).await?;
        let mut slot = entry.lock().await;

        if slot.booked_count == 0 {
            warn!("Release refused for slot {}: booked_count is already zero", slot_id);
            return Err(BookingError::InvalidState(
                "booked_count is already zero".to_string(),
            ));
        }

        slot.booked_count -= 1;
        slot.updated_at = Utc::now();
        debug!(
            "Released one unit on slot {} ({}/{})",
            slot_id, slot.booked_count, slot.capacity
        );
        Ok(())
    }

    /// Soft-deactivate a slot. Existing appointments keep referencing it;
    /// new reservations are refused.
    pub async fn deactivate(&self, slot_id: Uuid) -> Result<Slot, BookingError> {
        let entry = self.entry(slot_id).await?;
        let mut slot = entry.lock().await;
        slot.is_active = false;
        slot.updated_at = Utc::now();
        info!("Slot {} deactivated", slot_id);
        Ok(slot.clone())
    }

    /// Active slots with remaining capacity, filtered and annotated with
    /// `available`. Each slot is read under its own lock, so a returned
    /// entry is always a consistent snapshot of that slot.
    pub async fn list_available(&self, query: &SlotSearchQuery) -> Vec<SlotAvailability> {
        let entries: Vec<Arc<Mutex<Slot>>> =
            self.slots.read().await.values().cloned().collect();

        let mut results = Vec::new();
        for entry in entries {
            let slot = entry.lock().await;
            if !slot.is_active || slot.is_full() {
                continue;
            }
            if query.doctor_id.is_some_and(|id| slot.doctor_id != id) {
                continue;
            }
            if query.clinic_id.is_some_and(|id| slot.clinic_id != id) {
                continue;
            }
            if query.date_from.is_some_and(|from| slot.start_time < from) {
                continue;
            }
            if query.date_to.is_some_and(|to| slot.start_time > to) {
                continue;
            }
            results.push(SlotAvailability {
                available: slot.available(),
                slot: slot.clone(),
            });
        }

        results.sort_by_key(|entry| entry.slot.start_time);
        results
    }

    /// Snapshot of every slot, including inactive and full ones. Used by
    /// the consistency audit.
    pub async fn snapshot(&self) -> Vec<Slot> {
        let entries: Vec<Arc<Mutex<Slot>>> =
            self.slots.read().await.values().cloned().collect();

        let mut slots = Vec::with_capacity(entries.len());
        for entry in entries {
            slots.push(entry.lock().await.clone());
        }
        slots
    }
}
