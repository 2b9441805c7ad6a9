pub mod certificate_number;
pub mod hash;
pub mod html;
pub mod jwt;
