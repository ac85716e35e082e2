/// A programmable transaction, written as `sui client ptb` arguments.
///
/// Objects are referenced as `@0x..`, results of earlier commands by the
/// name given to [`Ptb::assign`]. The literal `gas` is the gas coin.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ptb {
    args: Vec<String>,
}

/// Formats an object id as a PTB argument.
#[inline]
pub fn object(id: &str) -> String {
    format!("@{id}")
}

fn vector<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let items: Vec<_> = items
        .into_iter()
        .map(|item| item.as_ref().to_owned())
        .collect();
    format!("[{}]", items.join(", "))
}

impl Ptb {
    /// Creates an empty transaction.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits the given amounts off a coin.
    pub fn split_coins(mut self, coin: &str, amounts: &[u64]) -> Self {
        self.args.push("--split-coins".into());
        self.args.push(coin.into());
        self.args.push(vector(amounts.iter().map(u64::to_string)));
        self
    }

    /// Merges coins into the first one.
    pub fn merge_coins<S: AsRef<str>>(mut self, into: &str, coins: &[S]) -> Self {
        self.args.push("--merge-coins".into());
        self.args.push(into.into());
        self.args.push(vector(coins));
        self
    }

    /// Sends objects to an address.
    pub fn transfer_objects<S: AsRef<str>>(
        mut self,
        objects: &[S],
        to: &str,
    ) -> Self {
        self.args.push("--transfer-objects".into());
        self.args.push(vector(objects));
        self.args.push(object(to));
        self
    }

    /// Calls a Move function, `target` being `package::module::function`.
    pub fn move_call<S: AsRef<str>>(
        mut self,
        target: &str,
        type_args: &[&str],
        args: &[S],
    ) -> Self {
        self.args.push("--move-call".into());
        self.args.push(target.into());
        if !type_args.is_empty() {
            self.args.push(format!("<{}>", type_args.join(", ")));
        }
        self.args
            .extend(args.iter().map(|arg| arg.as_ref().to_owned()));
        self
    }

    /// Names the result of the previous command.
    pub fn assign(mut self, name: &str) -> Self {
        self.args.push("--assign".into());
        self.args.push(name.into());
        self
    }

    /// Returns `true` if no command was added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Returns the arguments.
    #[inline]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer() {
        let ptb = Ptb::new()
            .split_coins("gas", &[1000])
            .assign("coin")
            .transfer_objects(&["coin"], "0xb0b");
        assert_eq!(
            ptb.args(),
            [
                "--split-coins",
                "gas",
                "[1000]",
                "--assign",
                "coin",
                "--transfer-objects",
                "[coin]",
                "@0xb0b",
            ]
        );
    }

    #[test]
    fn test_move_call() {
        let ptb = Ptb::new()
            .merge_coins("@0x1", &["@0x2", "@0x3"])
            .move_call(
                "0xpkg::liquid_staking::mint",
                &["0x2::sui::SUI"],
                &[object("0x5"), "coin".to_owned()],
            );
        assert_eq!(
            ptb.args(),
            [
                "--merge-coins",
                "@0x1",
                "[@0x2, @0x3]",
                "--move-call",
                "0xpkg::liquid_staking::mint",
                "<0x2::sui::SUI>",
                "@0x5",
                "coin",
            ]
        );
        assert!(Ptb::new().is_empty());
    }
}
