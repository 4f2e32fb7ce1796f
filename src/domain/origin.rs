use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Customer {
    /// Name, else email, else id: the first non-empty wins.
    pub fn display_name(&self) -> &str {
        [self.name.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Invoice this charge paid, if any
    #[serde(default)]
    pub invoice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    #[serde(default)]
    pub charge: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    /// Document number printed on the invoice, e.g. "A1B2C3-0001"
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Where the rendered invoice document can be downloaded
    #[serde(default)]
    pub document_url: Option<String>,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub subtotal: Cents,
    pub tax: Cents,
    pub total: Cents,
    pub currency: String,
    pub status: String,
}

impl Invoice {
    /// The document number, or the processor id for invoices not yet numbered.
    pub fn display_number(&self) -> &str {
        self.number
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: String,
    #[serde(default)]
    pub charge: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    pub status: String,
}

/// The business object that caused a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "object", rename_all = "lowercase")]
pub enum OriginatingObject {
    Charge(Charge),
    Refund(Refund),
    Invoice(Invoice),
    Dispute(Dispute),
}

impl OriginatingObject {
    pub fn id(&self) -> &str {
        match self {
            OriginatingObject::Charge(c) => &c.id,
            OriginatingObject::Refund(r) => &r.id,
            OriginatingObject::Invoice(i) => &i.id,
            OriginatingObject::Dispute(d) => &d.id,
        }
    }

    pub fn customer_id(&self) -> Option<&str> {
        let customer = match self {
            OriginatingObject::Charge(c) => c.customer.as_deref(),
            OriginatingObject::Refund(r) => r.customer.as_deref(),
            OriginatingObject::Invoice(i) => i.customer.as_deref(),
            OriginatingObject::Dispute(d) => d.customer.as_deref(),
        };
        customer.filter(|id| !id.is_empty())
    }

    /// Human description of the object, if it has a usable one.
    pub fn description(&self) -> Option<String> {
        let description = match self {
            OriginatingObject::Charge(c) => c.description.clone(),
            OriginatingObject::Refund(r) => r.description.clone().or_else(|| r.reason.clone()),
            OriginatingObject::Invoice(i) => i
                .description
                .clone()
                .or_else(|| i.number.as_ref().map(|n| format!("Invoice {}", n))),
            OriginatingObject::Dispute(d) => d.reason.as_ref().map(|r| format!("Dispute: {}", r)),
        };
        description.filter(|d| !d.trim().is_empty())
    }

    /// Invoice id referenced by this object, for invoice enrichment.
    pub fn invoice_id(&self) -> Option<&str> {
        match self {
            OriginatingObject::Charge(c) => c.invoice.as_deref(),
            OriginatingObject::Invoice(i) => Some(&i.id),
            OriginatingObject::Refund(_) | OriginatingObject::Dispute(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(name: Option<&str>, email: Option<&str>) -> Customer {
        Customer {
            id: "cus_1".into(),
            name: name.map(String::from),
            email: email.map(String::from),
        }
    }

    #[test]
    fn test_display_name_precedence() {
        assert_eq!(
            customer(Some("Acme SARL"), Some("billing@acme.fr")).display_name(),
            "Acme SARL"
        );
        assert_eq!(
            customer(None, Some("billing@acme.fr")).display_name(),
            "billing@acme.fr"
        );
        assert_eq!(
            customer(Some(""), Some("billing@acme.fr")).display_name(),
            "billing@acme.fr"
        );
        assert_eq!(customer(Some(" "), Some("")).display_name(), "cus_1");
        assert_eq!(customer(None, None).display_name(), "cus_1");
    }

    #[test]
    fn test_origin_accessors() {
        let origin = OriginatingObject::Charge(Charge {
            id: "ch_1".into(),
            customer: Some("cus_1".into()),
            description: Some("Subscription".into()),
            invoice: Some("in_1".into()),
        });
        assert_eq!(origin.id(), "ch_1");
        assert_eq!(origin.customer_id(), Some("cus_1"));
        assert_eq!(origin.description().as_deref(), Some("Subscription"));
        assert_eq!(origin.invoice_id(), Some("in_1"));
    }

    #[test]
    fn test_refund_description_falls_back_to_reason() {
        let origin = OriginatingObject::Refund(Refund {
            id: "re_1".into(),
            charge: Some("ch_1".into()),
            customer: Some(String::new()),
            description: None,
            reason: Some("requested_by_customer".into()),
        });
        assert_eq!(
            origin.description().as_deref(),
            Some("requested_by_customer")
        );
        assert_eq!(origin.customer_id(), None);
        assert_eq!(origin.invoice_id(), None);
    }
}
