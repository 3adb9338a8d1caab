mod cartridge;
mod mapper;
mod nrom;

pub use cartridge::{Cartridge, MirroringMode};
pub use mapper::{Mapper, create_mapper};
pub use nrom::NROMMapper;
