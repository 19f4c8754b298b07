//! BLE protocol constants for the UART bridge link

use uuid::Uuid;

// ----------------------------------------------------------------------------
// GATT Service and Characteristic UUIDs
// ----------------------------------------------------------------------------

/// Nordic UART Service advertised by the bridge hardware
pub const UART_SERVICE_UUID: Uuid = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);

/// Notify characteristic the bridge streams frames on
pub const UART_TX_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E);

/// Client-configuration descriptor written when notifications are enabled
///
/// The subscribe call performs this write; the constant records which
/// descriptor the request lands on.
pub const CLIENT_CHARACTERISTIC_CONFIG_UUID: Uuid =
    Uuid::from_u128(0x00002902_0000_1000_8000_00805F9B34FB);

// ----------------------------------------------------------------------------
// Link Parameters
// ----------------------------------------------------------------------------

/// ATT payload size the platform stack settles on after connection setup
///
/// The MTU exchange happens inside the platform during connect; there is no
/// separate client request to issue. This is the effective notification
/// payload a subscribed link carries.
pub const EFFECTIVE_ATT_PAYLOAD: u16 = 244;
