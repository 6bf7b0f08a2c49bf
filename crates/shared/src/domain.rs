use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(ShopId);
id_newtype!(ProductId);
id_newtype!(CartItemId);
id_newtype!(OrderId);
id_newtype!(FeedbackId);
id_newtype!(NotificationId);

/// Paged list resources exposed by the storefront API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListResource {
    Feedback,
    Cart,
    Orders,
    Notifications,
}

impl ListResource {
    pub const ALL: [ListResource; 4] = [
        ListResource::Feedback,
        ListResource::Cart,
        ListResource::Orders,
        ListResource::Notifications,
    ];

    /// Path of the resource relative to the API base url.
    pub fn path(self) -> &'static str {
        match self {
            ListResource::Feedback => "feedback",
            ListResource::Cart => "cart/items",
            ListResource::Orders => "orders",
            ListResource::Notifications => "notifications",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ListResource::Feedback => "feedback",
            ListResource::Cart => "cart",
            ListResource::Orders => "orders",
            ListResource::Notifications => "notifications",
        }
    }
}

impl fmt::Display for ListResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown list resource '{0}' (expected feedback, cart, orders or notifications)")]
pub struct UnknownResource(pub String);

impl FromStr for ListResource {
    type Err = UnknownResource;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        ListResource::ALL
            .into_iter()
            .find(|resource| {
                resource.name().eq_ignore_ascii_case(raw) || resource.path() == raw
            })
            .ok_or_else(|| UnknownResource(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resource_names_case_insensitively() {
        assert_eq!("Orders".parse::<ListResource>(), Ok(ListResource::Orders));
        assert_eq!(" cart ".parse::<ListResource>(), Ok(ListResource::Cart));
        assert_eq!("cart/items".parse::<ListResource>(), Ok(ListResource::Cart));
        assert!("wishlist".parse::<ListResource>().is_err());
    }

    #[test]
    fn display_matches_cli_name() {
        for resource in ListResource::ALL {
            assert_eq!(resource.to_string().parse::<ListResource>(), Ok(resource));
        }
    }
}
