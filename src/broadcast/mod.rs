pub mod packet;
pub mod sender;

pub use packet::ObservationPacket;
pub use sender::broadcast_packet;
