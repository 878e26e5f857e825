//! Payload builders for the storefront's audit events.
//!
//! The ledger treats every payload as opaque JSON. These builders exist so
//! producers emit the same key/value shapes at every call site: session
//! events carry `browser`, order events carry `browser_info`, and every
//! payload leads with an `action` key.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Placeholder used when a request carries no user agent or address.
pub const UNKNOWN: &str = "Unknown";

/// Browser reported when no known marker matches the user agent.
pub const UNKNOWN_BROWSER: &str = "Unknown Browser";

/// Request metadata recorded with user-facing events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub browser: String,
    pub ip_address: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            browser: UNKNOWN.into(),
            ip_address: UNKNOWN.into(),
        }
    }
}

impl ClientInfo {
    pub fn new(browser: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Self {
            browser: browser.into(),
            ip_address: ip_address.into(),
        }
    }

    /// Build from a raw `User-Agent` header and remote address.
    pub fn from_request(user_agent: Option<&str>, remote_addr: Option<&str>) -> Self {
        let browser = user_agent.map(browser_name).unwrap_or(UNKNOWN);
        Self::new(browser, remote_addr.unwrap_or(UNKNOWN))
    }
}

/// Reduce a user agent string to a browser family name.
///
/// Edge is checked first since its user agent also names Chrome. The rest
/// are tried in a fixed order, each requiring a version number after the
/// marker, so Opera (which also sends `Chrome/`) reports as Chrome.
pub fn browser_name(user_agent: &str) -> &'static str {
    if user_agent.contains("Edg/") {
        return "Microsoft Edge";
    }
    const MARKERS: [(&str, &str); 5] = [
        ("Chrome", "Chrome/"),
        ("Firefox", "Firefox/"),
        ("Safari", "Safari/"),
        ("Opera", "OPR/"),
        ("Internet Explorer", "MSIE "),
    ];
    MARKERS
        .iter()
        .find(|(_, marker)| has_versioned_marker(user_agent, marker))
        .map(|(name, _)| *name)
        .unwrap_or(UNKNOWN_BROWSER)
}

fn has_versioned_marker(haystack: &str, marker: &str) -> bool {
    haystack.match_indices(marker).any(|(at, _)| {
        haystack[at + marker.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    })
}

/// Order lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

/// One order line. Money amounts are decimal strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: String,
    pub quantity: u32,
    pub price: String,
    pub subtotal: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: u64,
    pub user: String,
    pub total_amount: String,
    pub payment_method: String,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
    pub client: ClientInfo,
    /// Order creation time as the storefront records it.
    pub timestamp: String,
}

/// Storefront audit events.
#[derive(Clone, Debug, PartialEq)]
pub enum AuditEvent {
    Register {
        user: String,
        client: ClientInfo,
    },
    Login {
        user: String,
        client: ClientInfo,
    },
    Logout {
        user: String,
        client: ClientInfo,
    },
    OrderPlaced(Box<OrderPlaced>),
    /// Admin moved an order from pending to processing.
    OrderConfirmed {
        order_id: u64,
        admin_user: String,
        timestamp: String,
        client: ClientInfo,
    },
    /// Admin moved an order from processing to shipped.
    OrderShipped {
        order_id: u64,
        admin_user: String,
        timestamp: String,
        client: ClientInfo,
    },
    /// Any status change made through the admin. `admin_user` of `None` is
    /// recorded as `"system"`.
    OrderStatusChanged {
        order_id: u64,
        admin_user: Option<String>,
        previous_status: Option<OrderStatus>,
        new_status: OrderStatus,
        timestamp: String,
    },
    /// Free-form payload, passed through untouched.
    Custom(Value),
}

impl AuditEvent {
    /// The `action` value this event records, if it has one.
    pub fn action(&self) -> Option<&'static str> {
        match self {
            Self::Register { .. } => Some("register"),
            Self::Login { .. } => Some("login"),
            Self::Logout { .. } => Some("logout"),
            Self::OrderPlaced(_) => Some("order_placed"),
            Self::OrderConfirmed { .. } => Some("order_confirmed"),
            Self::OrderShipped { .. } => Some("order_shipped"),
            Self::OrderStatusChanged { .. } => Some("order_status_changed"),
            Self::Custom(_) => None,
        }
    }

    pub fn to_payload(&self) -> Value {
        let action = self.action();
        match self {
            Self::Register { user, client }
            | Self::Login { user, client }
            | Self::Logout { user, client } => json!({
                "action": action,
                "user": user,
                "browser": client.browser,
                "ip_address": client.ip_address,
            }),
            Self::OrderPlaced(order) => json!({
                "action": action,
                "order_id": order.order_id,
                "user": order.user,
                "total_amount": order.total_amount,
                "payment_method": order.payment_method,
                "shipping_address": order.shipping_address,
                "items": order.items,
                "browser_info": order.client.browser,
                "ip_address": order.client.ip_address,
                "timestamp": order.timestamp,
            }),
            Self::OrderConfirmed {
                order_id,
                admin_user,
                timestamp,
                client,
            } => admin_transition(
                action,
                *order_id,
                admin_user,
                OrderStatus::Pending,
                OrderStatus::Processing,
                timestamp,
                client,
            ),
            Self::OrderShipped {
                order_id,
                admin_user,
                timestamp,
                client,
            } => admin_transition(
                action,
                *order_id,
                admin_user,
                OrderStatus::Processing,
                OrderStatus::Shipped,
                timestamp,
                client,
            ),
            Self::OrderStatusChanged {
                order_id,
                admin_user,
                previous_status,
                new_status,
                timestamp,
            } => json!({
                "action": action,
                "order_id": order_id,
                "admin_user": admin_user.as_deref().unwrap_or("system"),
                "previous_status": previous_status,
                "new_status": new_status,
                "timestamp": timestamp,
            }),
            Self::Custom(value) => value.clone(),
        }
    }
}

fn admin_transition(
    action: Option<&str>,
    order_id: u64,
    admin_user: &str,
    from: OrderStatus,
    to: OrderStatus,
    timestamp: &str,
    client: &ClientInfo,
) -> Value {
    json!({
        "action": action,
        "order_id": order_id,
        "admin_user": admin_user,
        "previous_status": from.as_str(),
        "new_status": to.as_str(),
        "timestamp": timestamp,
        "browser_info": client.browser,
        "ip_address": client.ip_address,
    })
}

impl From<AuditEvent> for Value {
    fn from(event: AuditEvent) -> Self {
        match event {
            AuditEvent::Custom(value) => value,
            other => other.to_payload(),
        }
    }
}

impl From<&AuditEvent> for Value {
    fn from(event: &AuditEvent) -> Self {
        event.to_payload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    #[test]
    fn browser_detection() {
        assert_eq!(browser_name(CHROME_UA), "Chrome");
        assert_eq!(
            browser_name("Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 Chrome/120.0 Safari/537.36 Edg/120.0"),
            "Microsoft Edge"
        );
        assert_eq!(
            browser_name("Mozilla/5.0 (X11; rv:121.0) Gecko/20100101 Firefox/121.0"),
            "Firefox"
        );
        assert_eq!(
            browser_name("Mozilla/5.0 (Macintosh) AppleWebKit/605.1.15 Version/17.1 Safari/605.1.15"),
            "Safari"
        );
        assert_eq!(browser_name("Mozilla/4.0 (compatible; MSIE 8.0; Windows NT 6.1)"), "Internet Explorer");
        assert_eq!(browser_name("curl/8.4.0"), UNKNOWN_BROWSER);
        // A marker without a version does not count.
        assert_eq!(browser_name("Chrome/ beta"), UNKNOWN_BROWSER);
    }

    #[test]
    fn opera_reports_as_chrome() {
        let ua = "Mozilla/5.0 AppleWebKit/537.36 Chrome/119.0.0.0 Safari/537.36 OPR/105.0.0.0";
        assert_eq!(browser_name(ua), "Chrome");
    }

    #[test]
    fn client_info_defaults() {
        let client = ClientInfo::from_request(None, None);
        assert_eq!(client, ClientInfo::default());
        assert_eq!(client.browser, "Unknown");
        let client = ClientInfo::from_request(Some(CHROME_UA), Some("10.0.0.1"));
        assert_eq!(client, ClientInfo::new("Chrome", "10.0.0.1"));
    }

    #[test]
    fn session_event_payload() {
        let event = AuditEvent::Login {
            user: "alice".into(),
            client: ClientInfo::new("Firefox", "127.0.0.1"),
        };
        assert_eq!(
            event.to_payload(),
            json!({"action": "login", "user": "alice", "browser": "Firefox", "ip_address": "127.0.0.1"})
        );
    }

    #[test]
    fn order_confirmed_payload() {
        let event = AuditEvent::OrderConfirmed {
            order_id: 42,
            admin_user: "root".into(),
            timestamp: "2024-02-02 09:00:00.000000+00:00".into(),
            client: ClientInfo::default(),
        };
        let payload = event.to_payload();
        assert_eq!(payload["action"], "order_confirmed");
        assert_eq!(payload["previous_status"], "pending");
        assert_eq!(payload["new_status"], "processing");
        assert_eq!(payload["browser_info"], "Unknown");
        assert!(payload.get("browser").is_none());
    }

    #[test]
    fn status_change_defaults_to_system() {
        let event = AuditEvent::OrderStatusChanged {
            order_id: 9,
            admin_user: None,
            previous_status: Some(OrderStatus::Shipped),
            new_status: OrderStatus::Delivered,
            timestamp: "t".into(),
        };
        let payload = Value::from(&event);
        assert_eq!(payload["admin_user"], "system");
        assert_eq!(payload["previous_status"], "shipped");
        assert_eq!(payload["new_status"], "delivered");
    }

    #[test]
    fn order_placed_payload_nests_address_and_items() {
        let event = AuditEvent::OrderPlaced(Box::new(OrderPlaced {
            order_id: 1,
            user: "alice".into(),
            total_amount: "25.50".into(),
            payment_method: "cod".into(),
            shipping_address: ShippingAddress {
                full_name: "Alice A".into(),
                address: "1 Main St".into(),
                city: "Pune".into(),
                state: "MH".into(),
                pincode: "411001".into(),
            },
            items: vec![OrderItem {
                product: "Mug".into(),
                quantity: 2,
                price: "12.75".into(),
                subtotal: "25.50".into(),
            }],
            client: ClientInfo::new("Safari", "10.1.1.1"),
            timestamp: "t".into(),
        }));
        let payload = Value::from(event);
        assert_eq!(payload["shipping_address"]["city"], "Pune");
        assert_eq!(payload["items"][0]["quantity"], 2);
        assert_eq!(payload["browser_info"], "Safari");
    }

    #[test]
    fn custom_passes_through() {
        let value = json!({"anything": [1, 2, 3]});
        let event = AuditEvent::Custom(value.clone());
        assert_eq!(event.action(), None);
        assert_eq!(Value::from(event), value);
    }
}
