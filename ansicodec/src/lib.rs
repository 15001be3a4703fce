//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! # HavokMud ANSI color markup
//!
//! Game text carries inline `$cSBFF` color codes. Before text reaches a
//! client it is converted with [`render`]: sessions with color enabled get
//! ANSI SGR escape sequences, everyone else gets the bare text.
//!
//! ```rust
//! use havok_ansicodec::render;
//!
//! assert_eq!(render("$c0009Danger$c0007!", false), "Danger!");
//! assert_eq!(render("$c0009Danger$c0007!", true), "\x1b[1;31;40mDanger\x1b[0m!");
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

mod markup;
mod style;

pub use self::markup::{ColorCode, DEFAULT_CODE, render, strip};
pub use self::style::{Attribute, Color, Style};
