//! Client-side mirror of the remote contact list
//!
//! The backend has no partial update: every add, rename, delete or import
//! computes the full desired list locally and replaces the remote set
//! wholesale. Invariants (country-code prefix, unique numbers) are enforced
//! here, before anything touches the network.

use std::io::{Read, Write};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use wabulk_core::{Result, WabulkError};

use crate::api::SenderClient;
use crate::model::Contact;

/// CSV row shape; the header `name,phoneNumber` makes exports directly
/// re-importable.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    name: String,
    #[serde(rename = "phoneNumber")]
    phone_number: String,
}

/// What a CSV import would do, computed before any network traffic.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportPlan {
    pub new_contacts: Vec<Contact>,
    /// One warning per skipped row (missing field or bad prefix).
    pub skipped_invalid: Vec<String>,
    pub skipped_duplicates: usize,
}

pub struct ContactStore {
    client: Arc<SenderClient>,
    contacts: RwLock<Vec<Contact>>,
}

impl ContactStore {
    pub fn new(client: Arc<SenderClient>) -> Self {
        Self {
            client,
            contacts: RwLock::new(Vec::new()),
        }
    }

    /// Local mirror snapshot.
    pub fn contacts(&self) -> Vec<Contact> {
        self.contacts.read().clone()
    }

    /// Refresh the mirror from the backend.
    pub async fn load(&self) -> Result<Vec<Contact>> {
        let contacts = self.client.get_contacts().await?;
        *self.contacts.write() = contacts.clone();
        Ok(contacts)
    }

    async fn save(&self, all: Vec<Contact>) -> Result<()> {
        self.client.register_contacts(&all).await?;
        *self.contacts.write() = all;
        Ok(())
    }

    pub async fn add(&self, contact: Contact) -> Result<()> {
        validate_contact(&contact)?;
        let mut all = self.contacts();
        if all.iter().any(|c| c.phone_number == contact.phone_number) {
            return Err(WabulkError::Validation(
                "This phone number already exists in your contacts".to_string(),
            ));
        }
        all.push(contact);
        self.save(all).await
    }

    /// Rename a contact; the phone number is the identity and cannot change.
    pub async fn rename(&self, phone_number: &str, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(WabulkError::Validation("Name is required".to_string()));
        }
        let mut all = self.contacts();
        let contact = all
            .iter_mut()
            .find(|c| c.phone_number == phone_number)
            .ok_or_else(|| WabulkError::Validation(format!("No contact with number {phone_number}")))?;
        contact.name = name;
        self.save(all).await
    }

    /// Delete is "save the remaining set". Returns how many were removed.
    pub async fn remove_many(&self, phone_numbers: &[String]) -> Result<usize> {
        if phone_numbers.is_empty() {
            return Err(WabulkError::Validation("Please select contacts to delete".to_string()));
        }
        let all = self.contacts();
        let remaining: Vec<Contact> = all
            .iter()
            .filter(|c| !phone_numbers.contains(&c.phone_number))
            .cloned()
            .collect();
        let removed = all.len() - remaining.len();
        self.save(remaining).await?;
        Ok(removed)
    }

    /// Import contacts from CSV. Invalid rows are skipped with a warning,
    /// duplicates of local numbers are skipped and counted; an import where
    /// nothing new survives is an error.
    pub async fn import_csv<R: Read>(&self, reader: R) -> Result<ImportPlan> {
        let existing = self.contacts();
        let plan = plan_import(reader, &existing)?;
        if plan.new_contacts.is_empty() {
            return Err(WabulkError::Validation(
                "No valid new contacts found in the CSV file".to_string(),
            ));
        }
        let mut all = existing;
        all.extend(plan.new_contacts.iter().cloned());
        self.save(all).await?;
        Ok(plan)
    }

    /// Serialize the full current list; no filtering.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for contact in self.contacts() {
            csv_writer
                .serialize(CsvRow {
                    name: contact.name,
                    phone_number: contact.phone_number,
                })
                .map_err(|e| WabulkError::Csv(e.to_string()))?;
        }
        csv_writer.flush().map_err(|e| WabulkError::Csv(e.to_string()))?;
        Ok(())
    }
}

/// Phone numbers must carry a country code; both fields are required.
pub fn validate_contact(contact: &Contact) -> Result<()> {
    if contact.name.trim().is_empty() || contact.phone_number.trim().is_empty() {
        return Err(WabulkError::Validation("Name and number are required".to_string()));
    }
    if !contact.phone_number.starts_with('+') {
        return Err(WabulkError::Validation(
            "Number must start with country code (+)".to_string(),
        ));
    }
    Ok(())
}

/// Pure import planning so the skip/duplicate rules are testable without a
/// backend.
pub fn plan_import<R: Read>(reader: R, existing: &[Contact]) -> Result<ImportPlan> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut plan = ImportPlan::default();
    let mut seen: std::collections::HashSet<String> =
        existing.iter().map(|c| c.phone_number.clone()).collect();

    for row in csv_reader.deserialize::<CsvRow>() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                plan.skipped_invalid.push(format!("Skipped unreadable row: {e}"));
                continue;
            }
        };
        let contact = Contact::new(row.name, row.phone_number);
        if let Err(e) = validate_contact(&contact) {
            plan.skipped_invalid
                .push(format!("Skipped {}: {e}", display_number(&contact)));
            continue;
        }
        if !seen.insert(contact.phone_number.clone()) {
            plan.skipped_duplicates += 1;
            continue;
        }
        plan.new_contacts.push(contact);
    }

    Ok(plan)
}

fn display_number(contact: &Contact) -> &str {
    if contact.phone_number.trim().is_empty() {
        "row with empty number"
    } else {
        &contact.phone_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing() -> Vec<Contact> {
        vec![Contact::new("Ada", "+441000"), Contact::new("Grace", "+441001")]
    }

    #[test]
    fn contact_without_plus_prefix_is_rejected() {
        let err = validate_contact(&Contact::new("Bob", "5551234")).unwrap_err();
        assert!(matches!(err, WabulkError::Validation(_)));
        assert!(err.to_string().contains("country code"));
    }

    #[test]
    fn contact_with_empty_fields_is_rejected() {
        assert!(validate_contact(&Contact::new("", "+1555")).is_err());
        assert!(validate_contact(&Contact::new("Bob", "  ")).is_err());
    }

    #[test]
    fn import_skips_rows_missing_a_number_and_keeps_the_rest() {
        let csv = "name,phoneNumber\n\
                   Alice,+15550001\n\
                   Bob,+15550002\n\
                   Carol,\n\
                   Dave,+15550003\n";
        let plan = plan_import(csv.as_bytes(), &[]).unwrap();
        assert_eq!(plan.new_contacts.len(), 3);
        assert_eq!(plan.skipped_invalid.len(), 1);
        assert_eq!(plan.skipped_duplicates, 0);
    }

    #[test]
    fn import_skips_numbers_without_country_code_with_a_warning() {
        let csv = "name,phoneNumber\nEve,5551234\n";
        let plan = plan_import(csv.as_bytes(), &[]).unwrap();
        assert!(plan.new_contacts.is_empty());
        assert_eq!(plan.skipped_invalid.len(), 1);
        assert!(plan.skipped_invalid[0].contains("5551234"));
    }

    #[test]
    fn import_counts_duplicates_of_existing_and_in_file_numbers() {
        let csv = "name,phoneNumber\n\
                   Ada Again,+441000\n\
                   New,+441002\n\
                   New Again,+441002\n";
        let plan = plan_import(csv.as_bytes(), &existing()).unwrap();
        assert_eq!(plan.new_contacts.len(), 1);
        assert_eq!(plan.new_contacts[0].phone_number, "+441002");
        assert_eq!(plan.skipped_duplicates, 2);
    }

    fn offline_store() -> ContactStore {
        // Discard-port base URL: any attempted request would surface as a
        // Network error, so a Validation error proves nothing was sent.
        let config = wabulk_core::AppConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            access_token: None,
            whatsapp_token: None,
            image_upload_url: None,
            image_upload_key: None,
            log_level: "info".to_string(),
        };
        ContactStore::new(Arc::new(SenderClient::new(&config)))
    }

    #[tokio::test]
    async fn add_rejects_a_bad_number_before_any_network_call() {
        let store = offline_store();
        let err = store.add(Contact::new("Bob", "5551234")).await.unwrap_err();
        assert!(matches!(err, WabulkError::Validation(_)));
    }

    #[tokio::test]
    async fn add_rejects_duplicates_before_any_network_call() {
        let store = offline_store();
        *store.contacts.write() = existing();
        let err = store.add(Contact::new("Ada II", "+441000")).await.unwrap_err();
        assert!(matches!(err, WabulkError::Validation(_)));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn export_then_import_round_trips() {
        let contacts = existing();
        let mut buffer = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buffer);
            for contact in &contacts {
                writer
                    .serialize(CsvRow {
                        name: contact.name.clone(),
                        phone_number: contact.phone_number.clone(),
                    })
                    .unwrap();
            }
            writer.flush().unwrap();
        }
        let header = String::from_utf8(buffer.clone()).unwrap();
        assert!(header.starts_with("name,phoneNumber"));

        let plan = plan_import(buffer.as_slice(), &[]).unwrap();
        assert_eq!(plan.new_contacts, contacts);
        assert!(plan.skipped_invalid.is_empty());
    }
}
