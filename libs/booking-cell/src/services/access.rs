// libs/booking-cell/src/services/access.rs
use shared_models::auth::{User, UserRole};
use uuid::Uuid;

use crate::models::{Appointment, BookingError, Slot};

/// Authenticated caller, resolved from the request's validated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn from_user(user: &User) -> Result<Self, BookingError> {
        let id = Uuid::parse_str(&user.id).map_err(|_| BookingError::Forbidden)?;
        Ok(Self {
            id,
            role: user.user_role(),
        })
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }
}

/// Role checks for every booking operation. Pure functions so the rules are
/// trivially testable away from any request plumbing.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessPolicy;

impl AccessPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Patients book for themselves; Admins book on anyone's behalf.
    pub fn can_book(&self, actor: &Actor, patient_id: Uuid) -> Result<(), BookingError> {
        match actor.role {
            UserRole::Admin => Ok(()),
            UserRole::Patient if actor.id == patient_id => Ok(()),
            _ => Err(BookingError::Forbidden),
        }
    }

    /// The owning patient or an Admin may cancel.
    pub fn can_cancel(&self, actor: &Actor, appointment: &Appointment) -> Result<(), BookingError> {
        match actor.role {
            UserRole::Admin => Ok(()),
            UserRole::Patient if actor.id == appointment.patient_id => Ok(()),
            _ => Err(BookingError::Forbidden),
        }
    }

    /// Doctors manage their own slots; Admins manage any.
    pub fn can_manage_slot(&self, actor: &Actor, doctor_id: Uuid) -> Result<(), BookingError> {
        match actor.role {
            UserRole::Admin => Ok(()),
            UserRole::Doctor if actor.id == doctor_id => Ok(()),
            _ => Err(BookingError::Forbidden),
        }
    }

    /// Soft-deleting a slot is Admin-only.
    pub fn can_deactivate(&self, actor: &Actor, _slot: &Slot) -> Result<(), BookingError> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(BookingError::Forbidden)
        }
    }

    /// Confirm/complete/no-show: the appointment's doctor or an Admin.
    pub fn can_transition(
        &self,
        actor: &Actor,
        appointment: &Appointment,
    ) -> Result<(), BookingError> {
        match actor.role {
            UserRole::Admin => Ok(()),
            UserRole::Doctor if actor.id == appointment.doctor_id => Ok(()),
            _ => Err(BookingError::Forbidden),
        }
    }

    /// The owning patient, the appointment's doctor, or an Admin may view.
    pub fn can_view(&self, actor: &Actor, appointment: &Appointment) -> Result<(), BookingError> {
        match actor.role {
            UserRole::Admin => Ok(()),
            UserRole::Patient if actor.id == appointment.patient_id => Ok(()),
            UserRole::Doctor if actor.id == appointment.doctor_id => Ok(()),
            _ => Err(BookingError::Forbidden),
        }
    }

    /// Patients may list their own appointments; Admins may list anyone's.
    pub fn can_list_for_patient(
        &self,
        actor: &Actor,
        patient_id: Uuid,
    ) -> Result<(), BookingError> {
        match actor.role {
            UserRole::Admin => Ok(()),
            UserRole::Patient if actor.id == patient_id => Ok(()),
            _ => Err(BookingError::Forbidden),
        }
    }

    /// The full appointment listing is Admin-only.
    pub fn can_list_all(&self, actor: &Actor) -> Result<(), BookingError> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(BookingError::Forbidden)
        }
    }

    /// The consistency audit is Admin-only.
    pub fn can_audit(&self, actor: &Actor) -> Result<(), BookingError> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(BookingError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::AppointmentStatus;

    fn actor(role: UserRole) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
        }
    }

    fn appointment_for(patient_id: Uuid, doctor_id: Uuid) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            clinic_id: Uuid::new_v4(),
            slot_id: Uuid::new_v4(),
            status: AppointmentStatus::Pending,
            reason_for_visit: Some("checkup".to_string()),
            notes: None,
            cancelled_at: None,
            cancelled_reason: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn patient_books_only_for_self() {
        let policy = AccessPolicy::new();
        let patient = actor(UserRole::Patient);
        assert!(policy.can_book(&patient, patient.id).is_ok());
        assert_eq!(
            policy.can_book(&patient, Uuid::new_v4()),
            Err(BookingError::Forbidden)
        );
    }

    #[test]
    fn admin_can_book_and_cancel_for_anyone() {
        let policy = AccessPolicy::new();
        let admin = actor(UserRole::Admin);
        let appointment = appointment_for(Uuid::new_v4(), Uuid::new_v4());
        assert!(policy.can_book(&admin, Uuid::new_v4()).is_ok());
        assert!(policy.can_cancel(&admin, &appointment).is_ok());
        assert!(policy.can_audit(&admin).is_ok());
    }

    #[test]
    fn doctor_cannot_cancel_a_patients_appointment() {
        let policy = AccessPolicy::new();
        let doctor = actor(UserRole::Doctor);
        let appointment = appointment_for(Uuid::new_v4(), doctor.id);
        assert_eq!(
            policy.can_cancel(&doctor, &appointment),
            Err(BookingError::Forbidden)
        );
        // But the same doctor can run status transitions and view it.
        assert!(policy.can_transition(&doctor, &appointment).is_ok());
        assert!(policy.can_view(&doctor, &appointment).is_ok());
    }

    #[test]
    fn doctor_manages_only_own_slots() {
        let policy = AccessPolicy::new();
        let doctor = actor(UserRole::Doctor);
        assert!(policy.can_manage_slot(&doctor, doctor.id).is_ok());
        assert_eq!(
            policy.can_manage_slot(&doctor, Uuid::new_v4()),
            Err(BookingError::Forbidden)
        );
    }

    #[test]
    fn only_admin_audits_or_deactivates() {
        let policy = AccessPolicy::new();
        for role in [UserRole::Doctor, UserRole::Patient] {
            assert_eq!(policy.can_audit(&actor(role)), Err(BookingError::Forbidden));
            assert_eq!(
                policy.can_list_all(&actor(role)),
                Err(BookingError::Forbidden)
            );
        }
        assert!(policy.can_list_all(&actor(UserRole::Admin)).is_ok());
    }

    #[test]
    fn malformed_user_id_is_forbidden() {
        let user = User {
            id: "not-a-uuid".to_string(),
            email: Some("x@example.com".to_string()),
            role: Some("patient".to_string()),
            created_at: Some(Utc::now()),
        };
        assert_eq!(Actor::from_user(&user), Err(BookingError::Forbidden));
    }
}
