use serde::Deserialize;

/// The allow list of organisations & service accounts entitled to create kafka instances.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct QuotaManagementList {
    #[serde(default)]
    pub registered_organisations: Vec<RegisteredOrganisation>,
    #[serde(default)]
    pub registered_service_accounts: Vec<RegisteredServiceAccount>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RegisteredOrganisation {
    pub id: String,
    /// The number of streaming units the organisation may consume across its instances.
    pub max_allowed_instances: i64,
    /// When set, every user of the organisation is registered.
    #[serde(default)]
    pub any_user: bool,
    #[serde(default)]
    pub registered_users: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RegisteredServiceAccount {
    pub username: String,
    pub max_allowed_instances: i64,
}

impl QuotaManagementList {
    pub fn organisation(&self, id: &str) -> Option<&RegisteredOrganisation> {
        self.registered_organisations.iter().find(|org| org.id == id)
    }

    pub fn service_account(&self, username: &str) -> Option<&RegisteredServiceAccount> {
        self.registered_service_accounts.iter().find(|acct| acct.username == username)
    }
}

impl RegisteredOrganisation {
    pub fn is_user_registered(&self, username: &str) -> bool {
        self.any_user || self.registered_users.iter().any(|user| user == username)
    }
}
