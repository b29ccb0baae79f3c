use bpnn::{ActivationFunction, LossType, Network};

fn main() -> anyhow::Result<()> {
    let mut network = Network::with_seed(0.1, LossType::Mse, 42);
    network.add_layer(4, ActivationFunction::Sigmoid)?;
    network.add_layer(1, ActivationFunction::Sigmoid)?;

    let inputs = vec![
        vec![1.0, 0.0],
        vec![1.0, 1.0],
        vec![0.0, 1.0],
        vec![0.0, 0.0],
    ];
    let expected_outputs = vec![
        vec![1.0],
        vec![0.0],
        vec![1.0],
        vec![0.0],
    ];

    let epochs = 10000;

    for epoch in 0..epochs {
        let loss = network.train_batch(&inputs, &expected_outputs)?;
        if epoch % 1000 == 0 {
            println!("Epoch {epoch}: loss = {loss:.6}");
        }
    }

    println!("{network}");
    for input in &inputs {
        println!("Input: {:?} -> Output: {:.4}", input, network.predict(input)?[0]);
    }
    Ok(())
}
