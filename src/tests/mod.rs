// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod scheduler;
mod store;
mod value;
