// SPDX-License-Identifier: GPL-3.0-or-later

//! Empty on purpose: this crate exists only to host the end-to-end test
//! suite under `tests/`, which exercises the assembled language (scanner
//! through VM) the way a user's `.l` script would, rather than any single
//! crate's internals.
