//! Collection of built-in sensors providing [interrupt trigger support](ariel_os_sensor_trigger).

#![no_std]
#![deny(clippy::pedantic)]

pub mod bmg160;
pub mod hts221;
