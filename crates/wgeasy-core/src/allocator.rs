// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use tracing::instrument;

use crate::error::{Result, WgEasyError};
use crate::model::StateDocument;

const SERVER_ORDINAL: u8 = 1;
const FIRST_CLIENT_ORDINAL: u8 = 2;
const LAST_CLIENT_ORDINAL: u8 = 254;

/// A dotted-quad with exactly one substitutable octet, e.g. `10.0.0.x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetTemplate {
	octets: [u8; 4],
	position: usize,
}

impl SubnetTemplate {
	pub fn parse(template: &str) -> Result<Self> {
		let invalid = || WgEasyError::InvalidTemplate(template.to_string());

		let parts: Vec<&str> = template.split('.').collect();
		if parts.len() != 4 {
			return Err(invalid());
		}

		let mut octets = [0u8; 4];
		let mut position = None;
		for (i, part) in parts.iter().enumerate() {
			if *part == "x" {
				if position.replace(i).is_some() {
					return Err(invalid());
				}
			} else {
				octets[i] = part.parse().map_err(|_| invalid())?;
			}
		}

		let position = position.ok_or_else(invalid)?;
		Ok(Self { octets, position })
	}

	pub fn address(&self, ordinal: u8) -> Ipv4Addr {
		let mut octets = self.octets;
		octets[self.position] = ordinal;
		Ipv4Addr::from(octets)
	}

	pub fn server_address(&self) -> Ipv4Addr {
		self.address(SERVER_ORDINAL)
	}

	/// The ordinal of `addr` if it lies in this template's subnet.
	pub fn ordinal_of(&self, addr: Ipv4Addr) -> Option<u8> {
		let candidate = addr.octets();
		let fixed_match = (0..4)
			.filter(|i| *i != self.position)
			.all(|i| candidate[i] == self.octets[i]);
		fixed_match.then_some(candidate[self.position])
	}
}

impl FromStr for SubnetTemplate {
	type Err = WgEasyError;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}

impl fmt::Display for SubnetTemplate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let parts: Vec<String> = self
			.octets
			.iter()
			.enumerate()
			.map(|(i, o)| {
				if i == self.position {
					"x".to_string()
				} else {
					o.to_string()
				}
			})
			.collect();
		f.write_str(&parts.join("."))
	}
}

/// Lowest free ordinal in `2..=254`.
pub fn next_free_ordinal(used: &BTreeSet<u8>) -> Option<u8> {
	(FIRST_CLIENT_ORDINAL..=LAST_CLIENT_ORDINAL).find(|ordinal| !used.contains(ordinal))
}

#[derive(Debug, Clone)]
pub struct AddressAllocator {
	template: SubnetTemplate,
}

impl AddressAllocator {
	pub fn new(template: SubnetTemplate) -> Self {
		Self { template }
	}

	pub fn template(&self) -> &SubnetTemplate {
		&self.template
	}

	/// Ordinals taken by addresses inside the template's subnet. Addresses
	/// outside it (after a re-address) cannot collide and are ignored.
	pub fn used_ordinals(&self, doc: &StateDocument) -> BTreeSet<u8> {
		doc.addresses()
			.filter_map(|addr| self.template.ordinal_of(addr))
			.collect()
	}

	#[instrument(skip(self, doc), fields(template = %self.template, clients = doc.clients.len()))]
	pub fn allocate(&self, doc: &StateDocument) -> Result<Ipv4Addr> {
		let used = self.used_ordinals(doc);
		next_free_ordinal(&used)
			.map(|ordinal| self.template.address(ordinal))
			.ok_or_else(|| WgEasyError::AddressSpaceExhausted(self.template.to_string()))
	}
}
